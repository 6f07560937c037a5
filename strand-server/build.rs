// Build script to compile the protobuf definitions.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::compile_protos("proto/strand.proto")?;

    println!("cargo:rerun-if-changed=proto/strand.proto");

    Ok(())
}
