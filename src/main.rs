fn main() -> anyhow::Result<()> {
    medprofile::run()
}
