use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    Mutex,
};

use settlement_engine::{
    gateway::{MobileMoneyRequest, MobileMoneyResponse},
    GatewayError,
    MobileMoneyGateway,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Accept,
    Reject,
    OmitTransactionId,
}

/// A gateway that answers every request the same way and remembers what it was asked.
#[derive(Debug, Clone)]
pub struct MockGateway {
    behaviour: Behaviour,
    counter: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<MobileMoneyRequest>>>,
}

impl MockGateway {
    pub fn new(behaviour: Behaviour) -> Self {
        Self { behaviour, counter: Arc::new(AtomicU64::new(0)), requests: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn accepting() -> Self {
        Self::new(Behaviour::Accept)
    }

    pub fn rejecting() -> Self {
        Self::new(Behaviour::Reject)
    }

    pub fn without_transaction_id() -> Self {
        Self::new(Behaviour::OmitTransactionId)
    }

    pub fn requests(&self) -> Vec<MobileMoneyRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl MobileMoneyGateway for MockGateway {
    async fn request_payment(&self, request: MobileMoneyRequest) -> Result<MobileMoneyResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        match self.behaviour {
            Behaviour::Accept => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(MobileMoneyResponse::new(format!("MM-TX-{n:04}")))
            },
            Behaviour::Reject => Err(GatewayError::Rejected("insufficient funds on wallet".into())),
            Behaviour::OmitTransactionId => Ok(MobileMoneyResponse::default()),
        }
    }
}
