use globwatch::cli::LogLevel;
use globwatch::logging::filter_directives;

#[test]
fn cli_level_wins_over_environment() {
    assert_eq!(
        filter_directives(Some(LogLevel::Debug), Some("trace")),
        "debug,notify=warn"
    );
}

#[test]
fn environment_is_used_verbatim() {
    assert_eq!(
        filter_directives(None, Some("globwatch::watch=trace")),
        "globwatch::watch=trace"
    );
}

#[test]
fn blank_environment_falls_back_to_info() {
    assert_eq!(filter_directives(None, Some("  ")), "info,notify=warn");
    assert_eq!(filter_directives(None, None), "info,notify=warn");
}
