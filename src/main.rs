fn main() {
    strexpr::cli::run();
}
