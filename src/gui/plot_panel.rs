//! Central spectrum plot.
//!
//! The visible-spectrum backdrop is cached as a 1xN texture built from the
//! renderer's gradient samples and stretched over the current view. The
//! texture is dropped whenever the renderer runs a full pass and rebuilt
//! lazily here.

use super::SpectralApp;
use eframe::egui::{self, Color32, ColorImage, TextureOptions, Ui, Vec2};
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotImage, PlotPoint, PlotPoints};

impl SpectralApp {
    pub(super) fn plot_panel(&mut self, ui: &mut Ui) {
        self.view_controls(ui);

        if self.renderer.show_gradient() {
            if self.gradient_texture.is_none() {
                let samples = self.renderer.gradient_samples();
                if !samples.is_empty() {
                    let pixels: Vec<Color32> = samples.iter().map(|&(_, c)| c).collect();
                    let image = ColorImage {
                        size: [pixels.len(), 1],
                        pixels,
                    };
                    self.gradient_texture = Some(ui.ctx().load_texture(
                        "spectrum_gradient",
                        image,
                        TextureOptions::LINEAR,
                    ));
                }
            }
        } else {
            self.gradient_texture = None;
        }

        let limits = self.renderer.limits();
        let gradient_span = {
            let samples = self.renderer.gradient_samples();
            match (samples.first(), samples.last()) {
                (Some(&(first, _)), Some(&(last, _))) => Some((first - 0.5, last + 0.5)),
                _ => None,
            }
        };
        let texture = self.gradient_texture.clone();
        let line_points: Vec<[f64; 2]> = self.renderer.line_points().collect();
        let overlays: Vec<(String, Color32, Vec<[f64; 2]>)> = self
            .renderer
            .overlays()
            .iter()
            .map(|(name, o)| {
                let points = o
                    .wavelengths
                    .iter()
                    .zip(&o.data)
                    .map(|(&w, &v)| [w, v])
                    .collect();
                (name.clone(), o.color, points)
            })
            .collect();

        // Texture expected but could not be built; rebuild the backdrop.
        let draw_failed =
            self.renderer.show_gradient() && gradient_span.is_some() && texture.is_none();

        Plot::new("spectrum")
            .show_grid(self.renderer.show_grid())
            .x_axis_label("Wavelength (nm)")
            .y_axis_label(self.selected_type.axis_label())
            .legend(Legend::default())
            .allow_drag(false)
            .allow_scroll(false)
            .allow_zoom(false)
            .allow_boxed_zoom(false)
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [limits.x_min, limits.y_min],
                    [limits.x_max, limits.y_max],
                ));

                if let (Some(texture), Some((x0, x1))) = (&texture, gradient_span) {
                    let center =
                        PlotPoint::new((x0 + x1) / 2.0, (limits.y_min + limits.y_max) / 2.0);
                    let size = Vec2::new(
                        (x1 - x0) as f32,
                        (limits.y_max - limits.y_min) as f32,
                    );
                    plot_ui.image(PlotImage::new(texture, center, size));
                }

                for (name, color, points) in overlays {
                    plot_ui.line(Line::new(PlotPoints::from(points)).color(color).name(name));
                }

                if !line_points.is_empty() {
                    plot_ui.line(
                        Line::new(PlotPoints::from(line_points))
                            .color(Color32::WHITE)
                            .width(1.5)
                            .name("Current"),
                    );
                }
            });

        if draw_failed {
            self.renderer.notify_draw_failure();
        }
    }

    fn view_controls(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            if ui.button("Zoom +").clicked() {
                self.renderer.zoom_in();
                self.gradient_texture = None;
            }
            if ui.button("Zoom -").clicked() {
                self.renderer.zoom_out();
                self.gradient_texture = None;
            }
            if ui.button("Reset").clicked() {
                self.renderer.reset_zoom();
                self.gradient_texture = None;
            }
            ui.separator();

            let mut autoscale = self.renderer.autoscale_y();
            if ui.checkbox(&mut autoscale, "Autoscale Y").changed() {
                self.renderer.set_autoscale_y(autoscale);
            }
            let mut grid = self.renderer.show_grid();
            if ui.checkbox(&mut grid, "Grid").changed() {
                self.renderer.set_show_grid(grid);
            }
            let mut gradient = self.renderer.show_gradient();
            if ui.checkbox(&mut gradient, "Spectrum colors").changed() {
                self.renderer.set_show_gradient(gradient);
                self.gradient_texture = None;
            }
        });
    }
}
