use eframe::egui;
use eframe::egui::Visuals;
use marker_scope::config::AppConfig;
use marker_scope::models::{AppState, DatasetState};
use marker_scope::ui;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub struct MarkerScopeApp {
    state: AppState,
}

impl eframe::App for MarkerScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui::dashboard(ui, &mut self.state);
                });
        });
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,marker_scope=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        "Starting MarkerScope (dataset: {}, schema inference rows: {})",
        config.dataset_path.display(),
        config.infer_schema_length
    );

    // Loaded once for the whole session; a failure leaves only the error on screen.
    let dataset = DatasetState::load(&config);
    let state = AppState::new(dataset, &config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_title(ui::TITLE),
        ..Default::default()
    };
    eframe::run_native(
        "MarkerScope",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Ok(Box::new(MarkerScopeApp { state }))
        }),
    )
}
