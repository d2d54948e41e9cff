use std::time::Duration;

use serde::Deserialize;

/// Tuning of the layout forces.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
	/// Distance at which a lone linked pair comes to rest.
	pub link_distance: f64,
	pub spring_strength: f64,
	pub node_mass: f64,
	/// Cap on any single force applied to a node.
	pub max_force: f64,
	pub max_speed: f64,
	/// Fraction of velocity kept after every solver step.
	pub damping: f64,
	/// Solver step at alpha 1. The actual step is scaled by alpha.
	pub time_step: f64,
	/// Minimum separation radius per node.
	pub collision_radius: f64,
	pub collision_strength: f64,
	/// The simulation goes to rest once alpha drops below this.
	pub alpha_min: f64,
	pub alpha_decay: f64,
}

impl Default for ForceConfig {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			link_distance: 80.0,
			spring_strength: 0.05,
			node_mass: 10.0,
			max_force: 100.0,
			max_speed: 3000.0,
			damping: 0.9,
			time_step: 0.05,
			collision_radius: 25.0,
			collision_strength: 0.7,
			alpha_min,
			// Cools from 1 to alpha_min in roughly 300 ticks.
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
		}
	}
}

impl ForceConfig {
	/// Repulsion that balances the spring pull at `link_distance`.
	///
	/// The spring pulls with `spring·d/2` and the charge pushes with
	/// `charge·m²/d²`, so equal forces at `d` give `charge = spring·d³/(2m²)`.
	pub fn charge(&self) -> f64 {
		let d = self.link_distance;
		self.spring_strength * d * d * d / (2.0 * self.node_mass * self.node_mass)
	}
}

/// Everything [`GraphView`](super::GraphView) needs besides its surface.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
	pub forces: ForceConfig,
	pub min_scale: f64,
	pub max_scale: f64,
	/// Energy injected on every update so new nodes settle.
	pub restart_alpha: f64,
	/// Alpha target held while a node is dragged.
	pub drag_alpha_target: f64,
	pub transition_ms: u64,
	pub focus_scale: f64,
	pub focus_highlight_ms: u64,
	/// Pointer travel (screen px) below which a press/release counts as a click.
	pub click_tolerance: f64,
	pub wheel_zoom_step: f64,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			forces: ForceConfig::default(),
			min_scale: 0.1,
			max_scale: 4.0,
			restart_alpha: 0.3,
			drag_alpha_target: 0.3,
			transition_ms: 750,
			focus_scale: 1.5,
			focus_highlight_ms: 2000,
			click_tolerance: 3.0,
			wheel_zoom_step: 1.1,
		}
	}
}

impl ViewConfig {
	pub fn transition(&self) -> Duration {
		Duration::from_millis(self.transition_ms)
	}

	pub fn focus_highlight(&self) -> Duration {
		Duration::from_millis(self.focus_highlight_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_config_keeps_defaults() {
		let config: ViewConfig =
			serde_json::from_str(r#"{ "max_scale": 8.0, "forces": { "link_distance": 120.0 } }"#)
				.unwrap();
		assert_eq!(config.max_scale, 8.0);
		assert_eq!(config.min_scale, 0.1);
		assert_eq!(config.forces.link_distance, 120.0);
		assert_eq!(config.forces.spring_strength, 0.05);
		assert_eq!(config.transition(), Duration::from_millis(750));
	}

	#[test]
	fn charge_grows_with_link_distance() {
		let base = ForceConfig::default();
		assert!((base.charge() - 128.0).abs() < 1e-9);
		let wide = ForceConfig {
			link_distance: 160.0,
			..base.clone()
		};
		assert!((wide.charge() - 8.0 * base.charge()).abs() < 1e-9);
	}
}
