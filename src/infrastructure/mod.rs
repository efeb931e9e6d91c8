pub mod jsonrpc;
pub mod logging;
pub mod rpc_validator;
