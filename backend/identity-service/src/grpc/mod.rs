/// gRPC server module for identity-service
///
/// Exports:
/// - IdentityServiceServer: AuthService RPC implementation
/// - portal: Generated protobuf types from auth_service.proto
pub mod server;

pub use server::portal;
pub use server::IdentityServiceServer;
