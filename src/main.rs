// src/main.rs
mod components;
mod exif_data;
mod exif_parser;
mod extraction;
mod location;
mod openlayers;
mod utils;
mod viewer_config;
mod viewer_state;

use components::metadata_viewer::MetadataViewer;
use std::rc::Rc;
use viewer_config::ViewerConfig;
use yew::prelude::*;

pub enum AppMsg {
    ConfigLoaded(ViewerConfig),
    ConfigLoadFailed(String),
}

pub struct App {
    config: Option<Rc<ViewerConfig>>,
}

impl Component for App {
    type Message = AppMsg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_future(async {
            match ViewerConfig::load().await {
                Ok(config) => AppMsg::ConfigLoaded(config),
                Err(e) => AppMsg::ConfigLoadFailed(e),
            }
        });

        Self { config: None }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            AppMsg::ConfigLoaded(config) => {
                log::info!(
                    "Loaded configuration (zoom {}, tiles {})",
                    config.map.zoom,
                    config.map.tile_url
                );
                self.config = Some(Rc::new(config));
                true
            }
            AppMsg::ConfigLoadFailed(error) => {
                log::warn!("Failed to load configuration, using defaults: {}", error);
                self.config = Some(Rc::new(ViewerConfig::default()));
                true
            }
        }
    }

    fn view(&self, _ctx: &Context<Self>) -> Html {
        let Some(config) = &self.config else {
            return html! {
                <div class="app-container">
                    <header class="app-header">
                        <h1>{"EXIF Map Viewer"}</h1>
                    </header>
                    <main class="app-main">
                        <div class="loading">{"Loading..."}</div>
                    </main>
                </div>
            };
        };

        html! {
            <div class="app-container">
                <header class="app-header">
                    <h1>{"EXIF Map Viewer"}</h1>
                    <p class="subtitle">{"Inspect photo metadata and see where it was taken"}</p>
                </header>

                <main class="app-main">
                    <MetadataViewer config={config.clone()} />
                </main>

                <footer class="app-footer">
                    <p>
                        {"Files are read locally and never leave the browser. "}
                        {"Map tiles © OpenStreetMap contributors."}
                    </p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
