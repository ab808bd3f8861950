pub mod get;
pub mod rm;
pub mod set;
pub mod serve;

pub use get::Get;
pub use rm::Rm;
pub use serve::Serve;
pub use set::Set;
