//! Status command implementation.

use anyhow::Result;
use crossfade_core::service::ServiceConnection;

use super::{GlobalArgs, StatusArgs};
use crate::ui::paint;

/// Run the status command.
pub async fn run(args: StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = super::connect_context(global).await?;
    let connections = ctx.connections().await;

    if args.json {
        let output = serde_json::json!({
            "source": ctx.source().await,
            "services": connections,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    for conn in &connections {
        println!("  {}", status_line(conn));
    }
    println!();
    println!("  Source: {}", ctx.source().await);
    println!();
    Ok(())
}

fn status_line(conn: &ServiceConnection) -> String {
    let state = if !conn.enabled {
        "disabled"
    } else if conn.authenticated {
        "connected"
    } else {
        "not connected"
    };
    let name = format!("{:<12}", conn.display_name);
    format!("{} {:<10} {}", paint(&conn.color_tag, &name), conn.service_id, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossfade_core::service::{AuthFlow, ServiceDescriptor};

    #[test]
    fn test_status_line_states() {
        let descriptor = ServiceDescriptor::new("tidal", "Tidal", "", AuthFlow::OAuth);
        let mut conn = ServiceConnection::from(&descriptor);
        assert!(status_line(&conn).ends_with("not connected"));

        conn.authenticated = true;
        let line = status_line(&conn);
        assert!(line.ends_with("connected") && !line.contains("not connected"));

        conn.enabled = false;
        assert!(status_line(&conn).ends_with("disabled"));
    }
}
