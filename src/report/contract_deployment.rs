use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::types::ContractId;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ContractDeployment {
    pub name: ContractId,
    pub artifact: String,
    pub address: Address,
}
