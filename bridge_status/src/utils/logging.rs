use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let format = fmt::format()
        .with_timer(fmt::time::time())
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    // Logs go to stderr so that stdout only carries search output.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::Layer::default()
                .with_writer(std::io::stderr)
                .event_format(format),
        )
        .init();
}

/// Used when `RUST_LOG` is unset: `info`, with the HTTP stack at `warn`.
fn default_filter() -> EnvFilter {
    EnvFilter::new("info")
        .add_directive(
            "reqwest=warn"
                .parse()
                .expect("assert: can parse env filter directive"),
        )
        .add_directive(
            "hyper=warn"
                .parse()
                .expect("assert: can parse env filter directive"),
        )
        .add_directive(
            "hyper_util=warn"
                .parse()
                .expect("assert: can parse env filter directive"),
        )
        .add_directive(
            "rustls=warn"
                .parse()
                .expect("assert: can parse env filter directive"),
        )
        .add_directive(
            "warp=warn"
                .parse()
                .expect("assert: can parse env filter directive"),
        )
}
