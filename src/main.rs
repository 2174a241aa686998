fn main() -> anyhow::Result<()> {
    kira_qcplot::cli::run::entry()
}
