fn main() {
    // Client stubs only; the server side is generated inside identity-service
    let proto_path = "../../proto/services/auth_service.proto";

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&[proto_path], &["../../proto/services/"])
        .unwrap_or_else(|e| panic!("Failed to compile auth_service: {}", e));

    println!("cargo:rerun-if-changed=../../proto/services/");
}
