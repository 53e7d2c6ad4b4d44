fn main() -> anyhow::Result<()> {
    coach_lib::run()
}
