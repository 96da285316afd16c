//! Service contracts implemented by every device pool back-end.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{ProvisioningError, ReservationError};
use crate::model::{Host, ProvisionInput, ProvisionOutput, Reservation};

/// Future returned by service operations.
pub type ServiceFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Control-plane contract for creating and managing provisions.
///
/// Implementations accept provision requests without blocking for host
/// assignment; callers poll [`ProvisionService::describe`] until the output
/// reaches a terminal [`crate::model::Status`].
pub trait ProvisionService: Send + Sync {
    /// Accepts or rejects a provision request.
    ///
    /// Repeating a call with the same input id returns the current ledger
    /// snapshot without creating a second request.
    fn provision(
        &self,
        input: ProvisionInput,
    ) -> ServiceFuture<'_, ProvisionOutput, ProvisioningError>;

    /// Returns the current snapshot for the provision identified by
    /// `output.id`. Back-ends may refresh reservation statuses from their
    /// provider while answering.
    fn describe<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, ProvisionOutput, ProvisioningError>;

    /// Releases every host reserved by the provision and forgets it.
    /// Returns the number of hosts returned to the pool.
    fn release<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, usize, ProvisioningError>;

    /// Extends the provision's lifetime by one provision timeout.
    fn extend<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, (), ProvisioningError>;

    /// Stops background work and releases owned resources. Idempotent.
    fn close(&self) -> ServiceFuture<'_, (), ProvisioningError>;
}

/// Data-plane contract resolving reservations into host coordinates.
pub trait ReservationService: Send + Sync {
    /// Resolves a reservation's device id into a reachable [`Host`].
    fn exchange<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> ServiceFuture<'a, Host, ReservationError>;

    /// Releases resources held by the reservation side. Idempotent.
    fn close(&self) -> ServiceFuture<'_, (), ReservationError>;
}

impl<S: ProvisionService + ?Sized> ProvisionService for Arc<S> {
    fn provision(
        &self,
        input: ProvisionInput,
    ) -> ServiceFuture<'_, ProvisionOutput, ProvisioningError> {
        (**self).provision(input)
    }

    fn describe<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, ProvisionOutput, ProvisioningError> {
        (**self).describe(output)
    }

    fn release<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, usize, ProvisioningError> {
        (**self).release(output)
    }

    fn extend<'a>(
        &'a self,
        output: &'a ProvisionOutput,
    ) -> ServiceFuture<'a, (), ProvisioningError> {
        (**self).extend(output)
    }

    fn close(&self) -> ServiceFuture<'_, (), ProvisioningError> {
        (**self).close()
    }
}

impl<S: ReservationService + ?Sized> ReservationService for Arc<S> {
    fn exchange<'a>(
        &'a self,
        reservation: &'a Reservation,
    ) -> ServiceFuture<'a, Host, ReservationError> {
        (**self).exchange(reservation)
    }

    fn close(&self) -> ServiceFuture<'_, (), ReservationError> {
        (**self).close()
    }
}
