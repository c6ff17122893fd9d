/// Threads for decompressing the input. Defaults to what the machine offers
pub fn determine_reader_threads(total: Option<usize>) -> anyhow::Result<usize> {
    if let Some(total) = total {
        if total < 1 {
            anyhow::bail!("Number of threads must be at least 1");
        }
        anyhow::Ok(total)
    } else if let Ok(total) = std::thread::available_parallelism() {
        anyhow::Ok(total.get())
    } else {
        log::warn!("Could not autodetect the number of threads available. Setting to 1, but it is better if you specify");
        anyhow::Ok(1)
    }
}
