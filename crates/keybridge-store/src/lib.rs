mod memory;

pub use memory::*;

use keybridge_core::{Error, GeneralFlowStore, ProxyAuthorizationCode, Transaction};

#[derive(Clone)]
pub enum FlowStore {
    Memory(MemoryFlowStore),
}

impl FlowStore {
    pub fn memory() -> Self {
        FlowStore::Memory(MemoryFlowStore::new())
    }
}

impl GeneralFlowStore for FlowStore {
    async fn insert_transaction(&self, txn: Transaction) -> Result<(), Error> {
        match self {
            FlowStore::Memory(store) => store.insert_transaction(txn).await,
        }
    }

    async fn take_transaction(&self, txn_id: &str) -> Result<Option<Transaction>, Error> {
        match self {
            FlowStore::Memory(store) => store.take_transaction(txn_id).await,
        }
    }

    async fn insert_code(&self, code: ProxyAuthorizationCode) -> Result<(), Error> {
        match self {
            FlowStore::Memory(store) => store.insert_code(code).await,
        }
    }

    async fn take_code(&self, code: &str) -> Result<Option<ProxyAuthorizationCode>, Error> {
        match self {
            FlowStore::Memory(store) => store.take_code(code).await,
        }
    }
}
