pub mod common;
pub mod create;
pub mod inspect_abi;

pub use self::common::{ContractSpec, ForgeSender};
pub use self::create::{ForgeCreate, ForgeOutput};
pub use self::inspect_abi::ForgeInspectAbi;
