//! Integration tests for the persistent web session
//! Cookies and the sticky destination must survive a restart through SQLite

use pathways::application::session::{
    CookieStore, LoadRequest, NavigationEvent, NavigationState, WebSurface,
};
use pathways::domain::{GateDecision, SessionError, StoredCookie};
use pathways::infra::app_config::AppConfig;
use pathways::infra::db::Database;
use pathways::infra::device::FixedDevice;
use pathways::infra::gate_client::HttpGateTransport;
use pathways::state::AppState;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSurface {
    loads: Mutex<Vec<LoadRequest>>,
}

impl WebSurface for RecordingSurface {
    fn load(&self, request: LoadRequest) -> Result<(), SessionError> {
        self.loads.lock().unwrap().push(request);
        Ok(())
    }
}

fn app(path: &Path) -> anyhow::Result<AppState> {
    let db = Database::open_at(path.to_path_buf())?;
    let device = FixedDevice(pathways::domain::DeviceContext {
        os_name_version: "iOS 17.4".into(),
        preferred_language: "en".into(),
        hardware_model_id: "iPhone15,2".into(),
        region_code: None,
    });
    AppState::with_parts(
        AppConfig::default(),
        Arc::new(db.kv_store()),
        Arc::new(HttpGateTransport::new()?),
        Arc::new(device),
    )
}

fn session_cookie(name: &str, value: &str) -> StoredCookie {
    StoredCookie {
        name: name.into(),
        value: value.into(),
        domain: "example.com".into(),
        path: "/".into(),
        expires: None,
        secure: true,
        http_only: true,
    }
}

#[tokio::test]
async fn test_cookies_and_destination_survive_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.sqlite");

    let first = app(&path)?;
    first.gate.save(&GateDecision::WebSession {
        destination_url: "https://example.com/start".into(),
    })?;
    let controller = first.session_controller();
    let surface = RecordingSurface::default();
    let url = controller.initialize(&surface)?;
    assert_eq!(url.map(|u| u.to_string()), Some("https://example.com/start".into()));
    assert!(surface.loads.lock().unwrap()[0].headers.is_empty());

    // The page logs in and moves on.
    controller.handle(NavigationEvent::Started);
    first.cookies.insert(session_cookie("sid", "abc"));
    let state = controller.handle(NavigationEvent::Finished {
        url: Some("https://example.com/account".into()),
    });
    assert_eq!(state, NavigationState::Loaded);
    drop(controller);
    drop(first);

    let second = app(&path)?;
    assert_eq!(
        second.gate.usable_destination()?,
        Some("https://example.com/account".into())
    );
    let controller = second.session_controller();
    let surface = RecordingSurface::default();
    controller.initialize(&surface)?;

    let loads = surface.loads.lock().unwrap();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].url.as_str(), "https://example.com/account");
    assert_eq!(
        loads[0].headers,
        vec![("Cookie".to_string(), "sid=abc".to_string())]
    );
    assert!(loads[0].user_agent.contains("iPhone OS 17_4"));
    assert_eq!(second.cookies.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_load_keeps_previous_state() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.sqlite");

    let running = app(&path)?;
    running.gate.save(&GateDecision::WebSession {
        destination_url: "https://example.com/start".into(),
    })?;
    let controller = running.session_controller();
    controller.initialize(&RecordingSurface::default())?;

    controller.handle(NavigationEvent::Started);
    running.cookies.insert(session_cookie("sid", "lost"));
    let state = controller.handle(NavigationEvent::Failed {
        error: "connection reset".into(),
    });
    assert_eq!(state, NavigationState::Failed);
    assert_eq!(
        running.gate.usable_destination()?,
        Some("https://example.com/start".into())
    );
    drop(controller);
    drop(running);

    let restarted = app(&path)?;
    restarted
        .session_controller()
        .initialize(&RecordingSurface::default())?;
    assert!(restarted.cookies.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_forget_cookies_clears_persisted_jar() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.sqlite");

    let running = app(&path)?;
    running.gate.save(&GateDecision::WebSession {
        destination_url: "https://example.com/start".into(),
    })?;
    let controller = running.session_controller();
    controller.initialize(&RecordingSurface::default())?;
    controller.handle(NavigationEvent::Started);
    running.cookies.insert(session_cookie("sid", "abc"));
    controller.handle(NavigationEvent::Finished { url: None });

    controller.forget_cookies()?;
    assert!(running.cookies.is_empty());
    drop(controller);
    drop(running);

    let restarted = app(&path)?;
    let surface = RecordingSurface::default();
    restarted.session_controller().initialize(&surface)?;
    assert!(surface.loads.lock().unwrap()[0].headers.is_empty());
    Ok(())
}
