//! Radio abstraction
//!
//! The link layer is an external collaborator. These traits expose the handful
//! of primitives the roles need; timeouts are applied by the callers so a
//! backend never has to know the configured budgets.

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::errors::TransportError;
use crate::types::{
    AdvertisingParams, Advertisement, ConnectionHandle, EndpointHandle, PeerAddress,
    PeerDescriptor, ScanParams, ServiceDefinition, ServiceHandle,
};

// ----------------------------------------------------------------------------
// Central Role
// ----------------------------------------------------------------------------

/// A radio able to scan and initiate connections
#[async_trait]
pub trait Central: Send + Sync {
    type Link: CentralLink;

    /// Start scanning and stream advertising reports until [`Central::stop_scan`]
    async fn start_scan(
        &self,
        params: &ScanParams,
    ) -> Result<BoxStream<'static, Advertisement>, TransportError>;

    async fn stop_scan(&self) -> Result<(), TransportError>;

    async fn connect(&self, peer: &PeerDescriptor) -> Result<Self::Link, TransportError>;
}

/// An open connection from the central side
#[async_trait]
pub trait CentralLink: Send {
    fn handle(&self) -> ConnectionHandle;

    async fn discover_service(&mut self, uuid: Uuid) -> Result<ServiceHandle, TransportError>;

    async fn discover_characteristic(
        &mut self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<EndpointHandle, TransportError>;

    async fn read(&mut self, endpoint: &EndpointHandle) -> Result<Vec<u8>, TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

// ----------------------------------------------------------------------------
// Peripheral Role
// ----------------------------------------------------------------------------

/// A radio able to host services and accept one inbound connection at a time
#[async_trait]
pub trait Peripheral: Send + Sync {
    type Connection: InboundConnection;

    async fn register_services(&self, services: &[ServiceDefinition])
        -> Result<(), TransportError>;

    /// Advertise until a central connects
    async fn advertise(&self, params: &AdvertisingParams)
        -> Result<Self::Connection, TransportError>;

    /// Replace the stored value of a local characteristic
    async fn write_value(&self, characteristic: Uuid, value: &[u8]) -> Result<(), TransportError>;

    /// Push the stored value of `characteristic` to the given connection
    async fn notify(
        &self,
        connection: ConnectionHandle,
        characteristic: Uuid,
    ) -> Result<(), TransportError>;
}

/// A connection accepted by a peripheral
#[async_trait]
pub trait InboundConnection: Send {
    fn handle(&self) -> ConnectionHandle;

    fn peer(&self) -> PeerAddress;

    /// Resolves once the central has gone away
    async fn disconnected(&mut self);
}
