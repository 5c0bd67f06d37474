//! Named colours used by the rendered screens

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub bg_color: String,
    pub text_color: String,
    pub accent_color: String,
    /// Background of overview boxes and tabs
    pub box_color: String,
    /// Text colour of the active tab
    pub btn_color: String,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg_color: "#2f3640".to_string(),
            text_color: "#f5f6fa".to_string(),
            accent_color: "#9c88ff".to_string(),
            box_color: "rgba(0, 0, 0, 0.5)".to_string(),
            btn_color: "#9c88ff".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            bg_color: "#f5f6fa".to_string(),
            text_color: "#2f3640".to_string(),
            accent_color: "#4cd137".to_string(),
            box_color: "rgba(255, 255, 255, 0.8)".to_string(),
            btn_color: "#4cd137".to_string(),
        }
    }

    /// Text colour of a tab
    pub fn tab_color(&self, is_active: bool) -> &str {
        if is_active {
            &self.btn_color
        } else {
            &self.text_color
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
