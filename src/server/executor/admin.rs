//! USE, CREATE-DATABASE, SHOW-DATABASES and CLUSTER-INFO

use bytes::Bytes;

use super::{ok, Executor, Request};
use crate::config::DbInfo;
use crate::error::{KvdbError, Result};
use crate::protocol::{MessageContent, Response};

/// Select the session's database
///
/// Replies with the name of the cluster owning the database, or an absent
/// marker for a standalone database.
pub struct UseExecutor;

impl Executor for UseExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        let name = request.text_parameter(0)?;
        if request.context.database(&name).is_none() {
            return Err(KvdbError::DatabaseNotFound(name));
        }
        request.session.set_database(&name)?;

        let info = request.context.database_info(&name);
        let cluster = info
            .cluster_item
            .map(|item| Bytes::from(item.name.into_bytes()));
        ok(Response::success(vec![cluster]))
    }
}

/// `CREATE-DATABASE name [partitions]`
pub struct CreateDatabaseExecutor;

impl Executor for CreateDatabaseExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        let name = request.text_parameter(0)?;
        DbInfo::validate_name(&name)?;

        let config = request.context.config();
        let partitions = match request.command.parameters.len() {
            1 => config.dbs_partitions,
            2 => {
                let raw = request.text_parameter(1)?;
                let n = raw.parse::<usize>().map_err(|_| {
                    KvdbError::InvalidArgument(format!(
                        "partitions must be a positive number, got {:?}",
                        raw
                    ))
                })?;
                DbInfo::validate_partitions(n)?;
                n
            }
            n => {
                return Err(KvdbError::InvalidArgument(format!(
                    "{}: expected 1 or 2 parameters, got {}",
                    request.command.name, n
                )))
            }
        };

        let info = DbInfo::new(name, config.dbs_root_dir.clone(), partitions);
        request.context.create_database(info)?;
        ok(Response::ok())
    }
}

/// Names of every open database, sorted
pub struct ShowDatabasesExecutor;

impl Executor for ShowDatabasesExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        let names = request
            .context
            .database_names()
            .into_iter()
            .map(|name| Some(Bytes::from(name.into_bytes())))
            .collect();
        ok(Response::success(names))
    }
}

/// Full cluster topology
pub struct ClusterInfoExecutor;

impl Executor for ClusterInfoExecutor {
    fn execute(&self, request: &Request<'_>) -> Result<MessageContent> {
        Ok(MessageContent::ClusterInfo(request.context.cluster_info()))
    }
}
