use std::collections::HashMap;

use super::scene::Scene;
use super::viewport::ViewTransform;

/// Something the scene can be drawn onto.
pub trait RenderSurface {
	fn size(&self) -> (f64, f64);
	fn draw(&mut self, scene: &Scene, transform: &ViewTransform);
}

/// Looks up surfaces by id, e.g. a document holding canvas elements.
pub trait SurfaceHost {
	type Surface: RenderSurface;

	fn find_surface(&self, id: &str) -> Option<Self::Surface>;
}

/// Surface that draws nothing and only counts frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessSurface {
	pub width: f64,
	pub height: f64,
	pub frames: usize,
}

impl RenderSurface for HeadlessSurface {
	fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	fn draw(&mut self, _scene: &Scene, _transform: &ViewTransform) {
		self.frames += 1;
	}
}

/// In-memory registry of headless surfaces.
#[derive(Clone, Debug, Default)]
pub struct HeadlessHost {
	surfaces: HashMap<String, (f64, f64)>,
}

impl HeadlessHost {
	pub fn with_surface(mut self, id: impl Into<String>, width: f64, height: f64) -> Self {
		self.surfaces.insert(id.into(), (width, height));
		self
	}
}

impl SurfaceHost for HeadlessHost {
	type Surface = HeadlessSurface;

	fn find_surface(&self, id: &str) -> Option<HeadlessSurface> {
		self.surfaces.get(id).map(|&(width, height)| HeadlessSurface {
			width,
			height,
			frames: 0,
		})
	}
}
