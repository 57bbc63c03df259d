use anyhow::Result;

fn main() -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&confgate::api::openapi())?
    );
    Ok(())
}
