use std::time::Duration;

/// Screen = graph * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl ViewTransform {
	pub const IDENTITY: Self = Self {
		x: 0.0,
		y: 0.0,
		k: 1.0,
	};

	/// Transform that puts graph point `(gx, gy)` in the middle of a
	/// `width` x `height` surface at scale `k`.
	pub fn centered_on(gx: f64, gy: f64, width: f64, height: f64, k: f64) -> Self {
		Self {
			x: width / 2.0 - gx * k,
			y: height / 2.0 - gy * k,
			k,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(gx * self.k + self.x, gy * self.k + self.y)
	}

	fn lerp(&self, to: &Self, t: f64) -> Self {
		Self {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

fn ease_cubic_in_out(t: f64) -> f64 {
	if t < 0.5 {
		4.0 * t * t * t
	} else {
		1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
	}
}

#[derive(Clone, Debug)]
struct Transition {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: Duration,
	duration: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Pan/zoom state of the surface, including any running animation.
#[derive(Clone, Debug)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
	pub pan: PanState,
	min_scale: f64,
	max_scale: f64,
	transform: ViewTransform,
	transition: Option<Transition>,
}

impl Viewport {
	pub fn new(width: f64, height: f64, min_scale: f64, max_scale: f64) -> Self {
		Self {
			width,
			height,
			pan: PanState::default(),
			min_scale,
			max_scale,
			transform: ViewTransform::IDENTITY,
			transition: None,
		}
	}

	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	/// Where the viewport will end up once the running animation finishes.
	pub fn target(&self) -> ViewTransform {
		self.transition.as_ref().map_or(self.transform, |t| t.to)
	}

	pub fn is_animating(&self) -> bool {
		self.transition.is_some()
	}

	fn clamp(&self, mut t: ViewTransform) -> ViewTransform {
		t.k = t.k.clamp(self.min_scale, self.max_scale);
		t
	}

	/// Jump without animation; cancels any running transition.
	pub fn set_transform(&mut self, t: ViewTransform) {
		self.transition = None;
		self.transform = self.clamp(t);
	}

	/// Animate from wherever the viewport is right now.
	pub fn animate_to(&mut self, to: ViewTransform, duration: Duration) {
		let to = self.clamp(to);
		if duration.is_zero() {
			self.set_transform(to);
			return;
		}
		self.transition = Some(Transition {
			from: self.transform,
			to,
			elapsed: Duration::ZERO,
			duration,
		});
	}

	pub fn advance(&mut self, dt: Duration) {
		let Some(tr) = self.transition.as_mut() else {
			return;
		};
		tr.elapsed += dt;
		if tr.elapsed >= tr.duration {
			self.transform = tr.to;
			self.transition = None;
			return;
		}
		let t = tr.elapsed.as_secs_f64() / tr.duration.as_secs_f64();
		self.transform = tr.from.lerp(&tr.to, ease_cubic_in_out(t));
	}

	/// Scale by `factor` keeping the screen point under the pointer fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		self.transition = None;
		let t = self.transform;
		let k = (t.k * factor).clamp(self.min_scale, self.max_scale);
		let ratio = k / t.k;
		self.transform = ViewTransform {
			x: sx - (sx - t.x) * ratio,
			y: sy - (sy - t.y) * ratio,
			k,
		};
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.transition = None;
		self.pan = PanState {
			active: true,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	pub fn end_pan(&mut self) {
		self.pan.active = false;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		self.transform.screen_to_graph(sx, sy)
	}
}
