//! Data access requests.

use dataroom_core::{
    validate_deadline, validate_topic, DataRequest, EncryptionOracle, Mutation, Principal,
    RegistryError, RegistryEvent, RequestId, RequestView, Result, SequenceKind, Timestamp,
};

use crate::state::RegistryState;
use crate::txn::Transaction;
use crate::widths;

impl<O: EncryptionOracle + ?Sized> Transaction<'_, O> {
    /// Record a request for data and return its id.
    ///
    /// The deadline must lie strictly after the transaction time.
    pub fn submit_request(
        &mut self,
        requester: Principal,
        topic: &str,
        budget: u64,
        deadline: Timestamp,
    ) -> Result<RequestId> {
        validate_topic(topic)?;
        validate_deadline(deadline, self.now)?;

        let id = RequestId(self.allocate(SequenceKind::Request));
        let budget_handle = self.seal(budget, widths::REQUEST_BUDGET, &[requester])?;

        self.push(Mutation::PutRequest(DataRequest {
            id,
            requester,
            topic: topic.to_string(),
            budget_handle,
            deadline,
            is_fulfilled: false,
            approved_datasets: Vec::new(),
        }));
        self.emit(RegistryEvent::DataRequested {
            request_id: id,
            requester,
            topic: topic.to_string(),
        });

        Ok(id)
    }
}

impl RegistryState {
    /// Public fields of a request.
    pub fn request_info(&self, id: RequestId) -> Result<RequestView> {
        self.request(id)
            .map(DataRequest::view)
            .ok_or(RegistryError::RequestNotFound(id))
    }
}
