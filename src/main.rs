fn main() -> Result<(), Box<dyn std::error::Error>> {
    askterm::cli::main()
}
