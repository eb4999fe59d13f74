//! BATCH-BEGIN, BATCH-ABORT and BATCH-COMMIT

use super::{ok, Executor, Request};
use crate::error::Result;
use crate::protocol::{MessageContent, Response};

pub struct BatchBeginExecutor;

impl Executor for BatchBeginExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        // a batch is bound to a database, so one must be selected first
        request.database()?;
        request.session.batch_begin()?;
        ok(Response::ok())
    }
}

pub struct BatchAbortExecutor;

impl Executor for BatchAbortExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        request.session.batch_abort()?;
        ok(Response::ok())
    }
}

pub struct BatchCommitExecutor;

impl Executor for BatchCommitExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        let db = match request.database() {
            Ok(db) => db,
            Err(e) => {
                // nowhere to apply the writes; leave batch mode clean.
                // batch_abort only fails when no batch is open, which is fine here
                let _ = request.session.batch_abort();
                return Err(e);
            }
        };
        let applied = request.session.batch_commit(db.as_ref())?;
        tracing::trace!("Session {} committed {} writes", request.session.key(), applied);
        ok(Response::ok())
    }
}
