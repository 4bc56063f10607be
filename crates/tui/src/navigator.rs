use std::sync::Arc;

use async_trait::async_trait;
use opass_core::{NavigationError, Navigator, StateId};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::app::AppEvent;

const PICKER_ID: &str = "event-picker";

/// Screens presented by the UI. The event picker is always at the bottom of
/// the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    EventPicker,
    EventHome,
    FeatureDetail(usize),
    LoginPrompt,
}

impl Screen {
    pub fn id(&self) -> StateId {
        match self {
            Screen::EventPicker => PICKER_ID,
            Screen::EventHome => "event-home",
            Screen::FeatureDetail(_) => "feature-detail",
            Screen::LoginPrompt => "login-prompt",
        }
        .to_string()
    }
}

/// Shared screen stack.
pub type ScreenStack = Arc<RwLock<Vec<Screen>>>;

pub fn new_stack() -> ScreenStack {
    Arc::new(RwLock::new(vec![Screen::EventPicker]))
}

/// Lets the handshake dismiss screens through the UI event loop.
///
/// Dismissal is requested over the app channel; the loop pops the screen
/// and then completes the request, so the next sample always sees the
/// updated stack.
pub struct UiNavigator {
    screens: ScreenStack,
    events: mpsc::Sender<AppEvent>,
}

impl UiNavigator {
    pub fn new(screens: ScreenStack, events: mpsc::Sender<AppEvent>) -> Self {
        Self { screens, events }
    }
}

#[async_trait]
impl Navigator for UiNavigator {
    async fn current_state_id(&self) -> StateId {
        self.screens
            .read()
            .last()
            .map(Screen::id)
            .unwrap_or_else(|| PICKER_ID.to_string())
    }

    fn is_baseline(&self, state: &StateId) -> bool {
        state == PICKER_ID
    }

    async fn dismiss_top(&self) -> Result<(), NavigationError> {
        let (done, completed) = oneshot::channel();
        self.events
            .send(AppEvent::Dismiss(done))
            .await
            .map_err(|_| NavigationError("ui event loop closed".to_string()))?;
        completed
            .await
            .map_err(|_| NavigationError("dismissal was dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dismissal_completes_after_pop() -> anyhow::Result<()> {
        let screens = new_stack();
        screens
            .write()
            .extend([Screen::EventHome, Screen::LoginPrompt]);
        let (tx, mut rx) = mpsc::channel(4);
        let navigator = UiNavigator::new(screens.clone(), tx);

        let ui = tokio::spawn({
            let screens = screens.clone();
            async move {
                while let Some(event) = rx.recv().await {
                    if let AppEvent::Dismiss(done) = event {
                        screens.write().pop();
                        let _ = done.send(());
                    }
                }
            }
        });

        assert_eq!(navigator.current_state_id().await, "login-prompt");
        navigator.dismiss_top().await?;
        assert_eq!(navigator.current_state_id().await, "event-home");
        navigator.dismiss_top().await?;
        let top = navigator.current_state_id().await;
        assert!(navigator.is_baseline(&top));

        drop(navigator);
        ui.await?;
        Ok(())
    }

    #[tokio::test]
    async fn closed_loop_is_a_navigation_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let navigator = UiNavigator::new(new_stack(), tx);
        assert!(navigator.dismiss_top().await.is_err());
    }
}
