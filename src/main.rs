use dredge::ui::output;

fn main() {
    if let Err(err) = dredge::cli::run() {
        output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}
