// src/components/metadata_viewer.rs
use crate::components::location_map::LocationMap;
use crate::exif_data::MetadataMap;
use crate::extraction::{extract_file, ExtractError, Extracted};
use crate::viewer_config::{MapSettings, ViewerConfig};
use crate::viewer_state::{MetadataPanel, ViewerState};
use gloo::file::{File, ObjectUrl};
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlInputElement};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct MetadataViewerProps {
    pub config: Rc<ViewerConfig>,
}

pub enum MetadataViewerMsg {
    FileSelected(File),
    ExtractionFinished {
        generation: u64,
        result: Result<Extracted, ExtractError>,
    },
}

pub struct MetadataViewer {
    state: ViewerState,
    // dropping the previous handle revokes its object URL
    preview: Option<ObjectUrl>,
    map_settings: Rc<MapSettings>,
}

impl Component for MetadataViewer {
    type Message = MetadataViewerMsg;
    type Properties = MetadataViewerProps;

    fn create(ctx: &Context<Self>) -> Self {
        Self {
            state: ViewerState::default(),
            preview: None,
            map_settings: Rc::new(ctx.props().config.map.clone()),
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().config.map != old_props.config.map {
            self.map_settings = Rc::new(ctx.props().config.map.clone());
        }
        true
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            MetadataViewerMsg::FileSelected(file) => {
                let generation = self.state.begin_selection(file.name());
                self.preview = Some(ObjectUrl::from(file.clone()));

                let link = ctx.link().clone();
                let settings = ctx.props().config.extraction.clone();
                spawn_local(async move {
                    let result = extract_file(&file, &settings).await;
                    link.send_message(MetadataViewerMsg::ExtractionFinished { generation, result });
                });
                true
            }
            MetadataViewerMsg::ExtractionFinished { generation, result } => {
                self.state.finish(generation, result)
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="metadata-viewer">
                { self.render_file_input(ctx) }
                <div class="viewer-content">
                    { self.render_preview() }
                    <LocationMap
                        coordinate={self.state.coordinate}
                        settings={self.map_settings.clone()}
                    />
                    { self.render_metadata() }
                </div>
            </div>
        }
    }
}

impl MetadataViewer {
    fn render_file_input(&self, ctx: &Context<Self>) -> Html {
        let onchange = ctx.link().batch_callback(|e: Event| {
            let input = e.target_dyn_into::<HtmlInputElement>()?;
            let file = input.files()?.get(0)?;
            Some(MetadataViewerMsg::FileSelected(File::from(file)))
        });

        html! {
            <div class="file-intake">
                <label for="image-input">{"Image: "}</label>
                <input id="image-input" type="file" accept="image/*" {onchange} />
                { match &self.state.file_name {
                    Some(name) => html! { <span class="file-name">{name.clone()}</span> },
                    None => html! {},
                } }
            </div>
        }
    }

    fn render_preview(&self) -> Html {
        match &self.preview {
            Some(url) => html! {
                <div class="image-panel">
                    <img class="image-preview" src={url.to_string()} alt="Selected image" />
                </div>
            },
            None => html! {},
        }
    }

    fn render_metadata(&self) -> Html {
        match &self.state.panel {
            MetadataPanel::Idle => html! {},
            MetadataPanel::Reading => html! {
                <div class="loading"><p>{"Reading metadata..."}</p></div>
            },
            MetadataPanel::Failed(err) => html! {
                <div class="error"><p>{format!("Error reading metadata: {}", err)}</p></div>
            },
            MetadataPanel::Loaded(tags) if tags.is_empty() => html! {
                <div class="metadata-panel"><p>{"No metadata found in this file."}</p></div>
            },
            MetadataPanel::Loaded(tags) => Self::render_tag_list(tags),
        }
    }

    fn render_tag_list(tags: &MetadataMap) -> Html {
        html! {
            <div class="metadata-panel">
                <h3>{"Metadata"}</h3>
                <ul class="metadata-list">
                    {for tags.iter().map(|(key, value)| {
                        html! {
                            <li key={key.clone()}>
                                <span class="metadata-key">{format!("{}: ", key)}</span>
                                <span class="metadata-value">{value.to_string()}</span>
                            </li>
                        }
                    })}
                </ul>
            </div>
        }
    }
}
