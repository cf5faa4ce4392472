// Build script for identity-service
// Compiles auth_service.proto for the gRPC server
fn main() {
    println!("cargo:rerun-if-changed=../proto/services/auth_service.proto");

    // identity-service PROVIDES AuthService; callers use the grpc-clients crate
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(
            &["../proto/services/auth_service.proto"],
            &["../proto/services"],
        )
        .expect("Failed to compile auth_service.proto for identity-service");
}
