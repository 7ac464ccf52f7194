//! Contract aggregate

pub mod model;
pub mod repository;

pub use model::{
    contract_number_for, format_contract_number, Contract, ContractDraft, ContractStatus,
};
pub use repository::{ContractRepository, SignatureRecord};
