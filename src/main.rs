fn main() -> std::process::ExitCode {
    xcode_resource_helper::cli_main()
}
