//! Region selectors.
//!
//! [`InteractiveSelector`] opens a window showing the captured frame and lets
//! the user drag a rectangle over it. [`NoSelector`] never selects anything,
//! which makes the cache fall back to the full frame (headless use).

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Result};
use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, TextureHandle, Vec2};
use image::RgbImage;

use crate::region::{RegionSelector, SelectedRect};

/// Largest initial size of the selector window. Bigger frames scroll.
const MAX_VIEWPORT: Vec2 = Vec2::new(1280.0, 800.0);

/// Always answers "no selection".
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSelector;

impl RegionSelector for NoSelector {
    fn select(&self, _image: &RgbImage, _label: &str) -> Result<Option<SelectedRect>> {
        Ok(None)
    }
}

/// Drag-to-select window built on eframe.
///
/// Releasing the mouse button confirms the rectangle, `Enter` confirms the
/// last drawn one, `Escape` or closing the window cancels. Blocks until the
/// window closes.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteractiveSelector;

impl RegionSelector for InteractiveSelector {
    fn select(&self, image: &RgbImage, label: &str) -> Result<Option<SelectedRect>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let outcome: Arc<Mutex<Option<SelectedRect>>> = Arc::new(Mutex::new(None));
        let app = SelectorApp::new(image, outcome.clone());

        let title = format!("Select Region for: {}", label);
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(Vec2::new(width as f32, height as f32).min(MAX_VIEWPORT))
                .with_title(&title)
                .with_window_level(egui::WindowLevel::AlwaysOnTop),
            ..Default::default()
        };

        crate::log(&format!("Opening region selector for \"{}\"", label));
        eframe::run_native(&title, options, Box::new(|_cc| Ok(Box::new(app))))
            .map_err(|e| anyhow!("Region selector window failed: {}", e))?;

        let selection = *outcome.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(selection)
    }
}

struct SelectorApp {
    /// Frame waiting to be uploaded as a texture on the first update
    pending: Option<egui::ColorImage>,
    texture: Option<TextureHandle>,
    image_size: [u32; 2],
    drag_start: Option<Pos2>,
    current: Option<SelectedRect>,
    outcome: Arc<Mutex<Option<SelectedRect>>>,
}

impl SelectorApp {
    fn new(image: &RgbImage, outcome: Arc<Mutex<Option<SelectedRect>>>) -> Self {
        let (width, height) = image.dimensions();
        Self {
            pending: Some(egui::ColorImage::from_rgb(
                [width as usize, height as usize],
                image.as_raw(),
            )),
            texture: None,
            image_size: [width, height],
            drag_start: None,
            current: None,
            outcome,
        }
    }

    fn confirm(&self, ctx: &egui::Context) {
        if let Some(selection) = self.current {
            crate::log(&format!("Region selected: {:?}", selection));
            *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(selection);
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for SelectorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(image) = self.pending.take() {
            self.texture = Some(ctx.load_texture(
                "captured_frame",
                image,
                egui::TextureOptions::NEAREST,
            ));
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.current = None;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Enter)) && self.current.is_some() {
            self.confirm(ctx);
            return;
        }

        let mut released = false;
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                egui::ScrollArea::both().show(ui, |ui| {
                    let Some(texture) = &self.texture else {
                        return;
                    };
                    let size = texture.size_vec2();
                    let (response, painter) = ui.allocate_painter(size, Sense::drag());
                    let origin = response.rect.min;
                    painter.image(
                        texture.id(),
                        response.rect,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );

                    if response.drag_started() {
                        self.drag_start =
                            response.interact_pointer_pos().map(|p| p - origin.to_vec2());
                    }
                    if let (Some(start), Some(pos)) =
                        (self.drag_start, response.interact_pointer_pos())
                    {
                        let end = pos - origin.to_vec2();
                        self.current = Some(selection_from_drag(start, end, self.image_size));
                    }
                    if response.drag_stopped() && self.drag_start.take().is_some() {
                        released = true;
                    }

                    if let Some(sel) = self.current {
                        let rect = Rect::from_min_max(
                            origin + Vec2::new(sel.x1 as f32, sel.y1 as f32),
                            origin + Vec2::new(sel.x2 as f32, sel.y2 as f32),
                        );
                        painter.rect_stroke(rect, 0.0, Stroke::new(2.0, Color32::RED));
                    }
                });
            });

        if released {
            self.confirm(ctx);
        }
    }
}

/// Turns two drag points (frame-relative, in pixels) into a clamped selection.
fn selection_from_drag(start: Pos2, end: Pos2, image_size: [u32; 2]) -> SelectedRect {
    let max_x = image_size[0] as f32;
    let max_y = image_size[1] as f32;
    let clamp_x = |v: f32| v.clamp(0.0, max_x) as i32;
    let clamp_y = |v: f32| v.clamp(0.0, max_y) as i32;

    SelectedRect::new(
        clamp_x(start.x.min(end.x)),
        clamp_y(start.y.min(end.y)),
        clamp_x(start.x.max(end.x)),
        clamp_y(start.y.max(end.y)),
    )
}
