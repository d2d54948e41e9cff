use std::f64::consts::PI;

use log::warn;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::scene::{LabelElement, LinkElement, NodeElement, Scene};
use super::surface::{RenderSurface, SurfaceHost};
use super::viewport::ViewTransform;

const BACKGROUND: &str = "#fafafa";
const LINK_STROKE: &str = "153, 153, 153";
const TRAJECTORY_STROKE: &str = "102, 126, 234";
const NODE_OUTLINE: &str = "#ffffff";
const SELECTED_OUTLINE: &str = "#333333";
const HIGHLIGHT_OUTLINE: &str = "#2196F3";
const LABEL_FILL: &str = "#333333";

/// Canvas element plus its 2D context. Drawing is skipped when the context
/// could not be obtained.
pub struct CanvasSurface {
	canvas: HtmlCanvasElement,
	ctx: Option<CanvasRenderingContext2d>,
}

impl CanvasSurface {
	pub fn new(canvas: HtmlCanvasElement) -> Self {
		let ctx = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|obj| obj.dyn_into::<CanvasRenderingContext2d>().ok());
		if ctx.is_none() {
			warn!("2d context unavailable; graph will not be drawn");
		}
		Self { canvas, ctx }
	}

	pub fn canvas(&self) -> &HtmlCanvasElement {
		&self.canvas
	}
}

impl RenderSurface for CanvasSurface {
	fn size(&self) -> (f64, f64) {
		(self.canvas.width() as f64, self.canvas.height() as f64)
	}

	fn draw(&mut self, scene: &Scene, transform: &ViewTransform) {
		let Some(ctx) = self.ctx.as_ref() else {
			return;
		};
		let (width, height) = self.size();
		ctx.set_fill_style_str(BACKGROUND);
		ctx.fill_rect(0.0, 0.0, width, height);
		ctx.save();
		let _ = ctx.translate(transform.x, transform.y);
		let _ = ctx.scale(transform.k, transform.k);
		for link in scene.links() {
			draw_link(ctx, link);
		}
		for node in scene.nodes() {
			draw_node(ctx, node, transform.k);
		}
		for label in scene.labels() {
			draw_label(ctx, label);
		}
		ctx.restore();
	}
}

fn draw_link(ctx: &CanvasRenderingContext2d, link: &LinkElement) {
	let (rgb, opacity, width) = if link.trajectory {
		(TRAJECTORY_STROKE, 0.9, link.stroke_width + 2.0)
	} else {
		(LINK_STROKE, link.stroke_opacity, link.stroke_width)
	};
	ctx.set_stroke_style_str(&format!("rgba({rgb}, {opacity})"));
	ctx.set_line_width(width);
	ctx.begin_path();
	ctx.move_to(link.x1, link.y1);
	ctx.line_to(link.x2, link.y2);
	ctx.stroke();
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &NodeElement, k: f64) {
	let (x, y, r) = (node.cx, node.cy, node.radius);

	if node.marks.trajectory || node.marks.highlighted {
		if let Ok(gradient) = ctx.create_radial_gradient(x, y, r * 0.5, x, y, r * 2.0) {
			let _ = gradient.add_color_stop(0.0, &format!("rgba({TRAJECTORY_STROKE}, 0.45)"));
			let _ = gradient.add_color_stop(1.0, &format!("rgba({TRAJECTORY_STROKE}, 0)"));
			ctx.begin_path();
			let _ = ctx.arc(x, y, r * 2.0, 0.0, 2.0 * PI);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
	}

	ctx.set_global_alpha(if node.marks.pruned { 0.5 } else { 1.0 });
	ctx.begin_path();
	let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(node.fill);
	ctx.fill();
	ctx.set_global_alpha(1.0);

	let (outline, width) = if node.marks.selected {
		(SELECTED_OUTLINE, 3.0)
	} else if node.marks.highlighted {
		(HIGHLIGHT_OUTLINE, 3.0)
	} else {
		(NODE_OUTLINE, 1.5)
	};
	ctx.set_stroke_style_str(outline);
	ctx.set_line_width(width / k.max(0.5));
	ctx.stroke();
}

fn draw_label(ctx: &CanvasRenderingContext2d, label: &LabelElement) {
	let weight = if label.highlighted { "bold " } else { "" };
	ctx.set_font(&format!("{weight}{}px sans-serif", label.font_size));
	ctx.set_text_align("center");
	ctx.set_fill_style_str(LABEL_FILL);
	let _ = ctx.fill_text(&label.text, label.x, label.y);
}

/// Resolves canvas elements in the current document.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentHost;

impl SurfaceHost for DocumentHost {
	type Surface = CanvasSurface;

	fn find_surface(&self, id: &str) -> Option<CanvasSurface> {
		let canvas = web_sys::window()?
			.document()?
			.get_element_by_id(id)?
			.dyn_into::<HtmlCanvasElement>()
			.ok()?;
		Some(CanvasSurface::new(canvas))
	}
}
