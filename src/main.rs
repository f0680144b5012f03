use anyhow::Result;

fn main() -> Result<()> {
    csv_ingest::run()
}
