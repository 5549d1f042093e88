//! Description of the legacy gesture API being migrated away from.
//!
//! The engine itself is name-agnostic; everything it searches for (module
//! specifiers, class and token names, template event bindings) comes from
//! the [`LegacyApi`] value handed to it. The defaults here describe the
//! HammerJS setup found in Angular-style projects.

/// Names and module specifiers of the deprecated gesture integration.
#[derive(Debug, Clone)]
pub struct LegacyApi {
    /// Module specifier of the gesture library itself (`import 'hammerjs'`).
    pub library_module: String,
    /// Name of the deprecated gesture configuration class.
    pub config_class: String,
    /// Module specifiers the deprecated configuration class is importable from.
    pub config_modules: Vec<String>,
    /// Dependency-injection token binding a gesture configuration.
    pub config_token: String,
    /// Module specifier the token and the integration module come from.
    pub framework_module: String,
    /// Class name of the integration module to register for template bindings.
    pub integration_module: String,
    /// Global identifier the library installs at runtime (`window.Hammer`).
    pub global_name: String,
    /// Event names the library provides out of the box.
    pub standard_events: Vec<String>,
    /// Event names only provided by the deprecated configuration class.
    pub custom_events: Vec<String>,
}

impl Default for LegacyApi {
    fn default() -> Self {
        LegacyApi {
            library_module: "hammerjs".into(),
            config_class: "GestureConfig".into(),
            config_modules: vec![
                "@angular/material".into(),
                "@angular/material/core".into(),
            ],
            config_token: "HAMMER_GESTURE_CONFIG".into(),
            framework_module: "@angular/platform-browser".into(),
            integration_module: "HammerModule".into(),
            global_name: "Hammer".into(),
            standard_events: [
                "pan", "panstart", "panmove", "panend", "pancancel", "panleft", "panright",
                "panup", "pandown", "pinch", "pinchstart", "pinchmove", "pinchend",
                "pinchcancel", "pinchin", "pinchout", "press", "pressup", "rotate",
                "rotatestart", "rotatemove", "rotateend", "rotatecancel", "swipe",
                "swipeleft", "swiperight", "swipeup", "swipedown", "tap",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            custom_events: [
                "longpress", "slide", "slidestart", "slideend", "slideright", "slideleft",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl LegacyApi {
    /// Whether `module` refers to the deprecated configuration class's home.
    pub fn is_config_module(&self, module: &str) -> bool {
        self.config_modules.iter().any(|m| m == module)
    }

    /// Template attribute form of an event binding, e.g. `(tap)`.
    ///
    /// Returns which set the attribute belongs to, if any.
    pub fn classify_binding(&self, attribute: &str) -> Option<EventKind> {
        let name = attribute.strip_prefix('(')?.strip_suffix(')')?;
        if self.standard_events.iter().any(|e| e == name) {
            Some(EventKind::Standard)
        } else if self.custom_events.iter().any(|e| e == name) {
            Some(EventKind::Custom)
        } else {
            None
        }
    }
}

/// Which configured event set a template binding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Standard,
    Custom,
}

/// Source of the relocated gesture configuration file.
///
/// Written into the project when templates use custom events, so the
/// deprecated class can be replaced by a copy the user owns.
pub const GESTURE_CONFIG_TEMPLATE: &str = r#"import { Injectable } from '@angular/core';
import { HammerGestureConfig } from '@angular/platform-browser';

/**
 * Gesture configuration that provides the custom gesture events previously
 * supplied by the deprecated library configuration. Adjust the recognizer
 * options below to match the behavior your application relies on.
 */
@Injectable()
export class GestureConfig extends HammerGestureConfig {
  overrides = {
    pan: { threshold: 0 },
    rotate: { enable: true },
  };

  buildHammer(element: HTMLElement) {
    const instance = super.buildHammer(element);
    this.configureCustomRecognizers(instance);
    return instance;
  }

  private configureCustomRecognizers(instance: any) {
    const press = instance.get('press');
    const slide = new (window as any).Hammer.Pan({
      event: 'slide',
      threshold: 0,
    });
    const longpress = new (window as any).Hammer.Press({
      event: 'longpress',
      time: 500,
    });
    slide.recognizeWith(instance.get('pan'));
    longpress.recognizeWith(press);
    instance.add([slide, longpress]);
  }
}
"#;

/// Default base name for the relocated configuration file.
pub const GESTURE_CONFIG_FILE_STEM: &str = "gesture-config";
