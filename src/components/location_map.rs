// src/components/location_map.rs
use crate::exif_data::GpsCoordinate;
use crate::location::LocationRenderer;
use crate::openlayers::OlBackend;
use crate::viewer_config::MapSettings;
use std::rc::Rc;
use web_sys::HtmlElement;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct LocationMapProps {
    pub coordinate: Option<GpsCoordinate>,
    pub settings: Rc<MapSettings>,
}

#[function_component(LocationMap)]
pub fn location_map(props: &LocationMapProps) -> Html {
    let container_ref = use_node_ref();
    let renderer = use_mut_ref(|| LocationRenderer::new(OlBackend));

    // ------ MAP LIFECYCLE ------
    {
        let container_ref = container_ref.clone();
        let renderer = renderer.clone();

        use_effect_with(
            (props.coordinate, props.settings.clone()),
            move |(coordinate, settings)| {
                let target = container_ref.cast::<HtmlElement>();
                renderer
                    .borrow_mut()
                    .sync(target.as_ref(), *coordinate, settings);

                // Runs before the next coordinate is applied and on unmount
                move || renderer.borrow_mut().clear()
            },
        );
    }

    let Some(coordinate) = props.coordinate else {
        return html! {};
    };

    html! {
        <div class="location-panel">
            <div ref={container_ref} class="map-container"></div>
            <p class="map-caption">{ format!("📍 {}", coordinate) }</p>
        </div>
    }
}
