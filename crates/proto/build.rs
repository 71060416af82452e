use std::{io, path::Path};

fn main() -> io::Result<()> {
  let proto_dir = Path::new("proto");
  let csi_proto_file = proto_dir.join("csi.proto");

  println!("cargo:rerun-if-changed={}", csi_proto_file.display());

  tonic_build::configure()
    .build_client(false)
    .build_server(true)
    .compile(&[csi_proto_file.as_path()], &[proto_dir])
}
