use anyhow::{Context, Result};
use tanto_client::TantoClient;
use tanto_core::{Widget, Window, CONFIG};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let client = TantoClient::from_config(&CONFIG)?;
    let event = client
        .show_dialog(&dialog())
        .await
        .context("failed to show the buttons dialog")?;

    match event {
        Some(event) => println!("{}", event),
        None => println!("Window closed without an event"),
    }

    Ok(())
}

fn dialog() -> Window {
    Window::new()
        .with_size(500, 400)
        .with_fixed(true)
        .with_body(Widget::column([
            Widget::button("mybutton1", "Click 1"),
            Widget::button("mybutton2", "Click 2"),
            Widget::button("mybutton3", "Click 3"),
        ]))
}

fn init_tracing() {
    // stdout is reserved for the event line
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    );
}
