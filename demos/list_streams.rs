#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use winfs_rs::streams::{self, StreamEnumOptions};

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: list_streams <path>"))?;

    for entry in streams::enumerate_streams(&path, StreamEnumOptions::default())? {
        let entry = entry?;
        println!(
            "type={:?}, name={:?}, size={}, attributes={}",
            entry.stream_type, entry.name, entry.size, entry.attributes
        );
    }

    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("list_streams requires Windows");
}
