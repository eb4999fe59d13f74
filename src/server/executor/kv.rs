//! EXISTS, GET and PUT

use bytes::Bytes;

use super::{ok, Executor, Request};
use crate::error::{KvdbError, Result};
use crate::protocol::{MessageContent, Response};

fn require_keys(request: &Request<'_>) -> Result<()> {
    if request.command.parameters.is_empty() {
        return Err(KvdbError::InvalidArgument(format!(
            "{}: at least one key is required",
            request.command.name
        )));
    }
    Ok(())
}

/// One existence flag per key
pub struct ExistsExecutor;

impl Executor for ExistsExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        require_keys(request)?;
        let db = request.database()?;
        let flags = request
            .command
            .parameters
            .iter()
            .map(|key| request.session.exists(db.as_ref(), key))
            .collect::<Result<Vec<bool>>>()?;
        ok(Response::flags(&flags))
    }
}

/// One value (or absent marker) per key
pub struct GetExecutor;

impl Executor for GetExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        require_keys(request)?;
        let db = request.database()?;
        let values = request
            .command
            .parameters
            .iter()
            .map(|key| request.session.get(db.as_ref(), key))
            .collect::<Result<Vec<Option<Bytes>>>>()?;
        ok(Response::success(values))
    }
}

/// Interleaved key, value pairs
pub struct PutExecutor;

impl Executor for PutExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        let params = &request.command.parameters;
        if params.is_empty() || params.len() % 2 != 0 {
            return Err(KvdbError::InvalidArgument(
                "keys and values must be in pairs".to_string(),
            ));
        }
        let db = request.database()?;
        let pairs = params
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        request.session.put(db.as_ref(), pairs)?;
        ok(Response::ok())
    }
}
