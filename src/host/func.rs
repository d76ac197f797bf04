use crate::error::Trap;
use crate::model::Value;

/// Host function callable through the import seam.
/// At most one return value, matching MVP result arity.
pub type HostFunc = dyn Fn(&[Value]) -> Result<Option<Value>, Trap> + Send + Sync;
