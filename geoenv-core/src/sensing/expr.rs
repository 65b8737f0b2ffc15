//! Earth Engine expression graphs, serialized the way the REST
//! `value:compute` endpoint expects them.

use chrono::Duration;
use serde_json::{Map, Value, json};

use super::SampleRequest;

/// Key under which the image acquisition time is returned next to the band means.
pub const TIME_START_KEY: &str = "system:time_start";

const MAX_PIXELS: f64 = 1e9;

fn constant(value: impl Into<Value>) -> Value {
    json!({ "constantValue": value.into() })
}

fn reference(name: &str) -> Value {
    json!({ "valueReference": name })
}

fn invoke(function: &str, arguments: &[(&str, Value)]) -> Value {
    let arguments: Map<String, Value> = arguments
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

fn filter(collection: Value, predicate: Value) -> Value {
    invoke(
        "Collection.filter",
        &[("collection", collection), ("filter", predicate)],
    )
}

fn date(value: String) -> Value {
    invoke("Date", &[("value", constant(value))])
}

/// Expression evaluating to `{band: mean, ..., "system:time_start": millis}`
/// for the newest image of the filtered collection.
pub fn latest_band_means(request: &SampleRequest) -> Value {
    let point = invoke(
        "GeometryConstructors.Point",
        &[(
            "coordinates",
            constant(json!([request.point.longitude, request.point.latitude])),
        )],
    );
    let region = invoke(
        "Geometry.buffer",
        &[("geometry", point.clone()), ("distance", constant(request.buffer_m))],
    );

    let mut collection = invoke("ImageCollection.load", &[("id", constant(request.collection))]);
    collection = filter(
        collection,
        invoke(
            "Filter.intersects",
            &[("leftField", constant(".all")), ("rightValue", point)],
        ),
    );

    // filterDate treats the end as exclusive; include the end day.
    let range = invoke(
        "DateRange",
        &[
            ("start", date(request.start.format("%Y-%m-%d").to_string())),
            (
                "end",
                date((request.end + Duration::days(1)).format("%Y-%m-%d").to_string()),
            ),
        ],
    );
    collection = filter(
        collection,
        invoke(
            "Filter.dateRangeContains",
            &[("leftValue", range), ("rightField", constant(TIME_START_KEY))],
        ),
    );

    if let Some(max_cloud) = request.max_cloud_pct {
        collection = filter(
            collection,
            invoke(
                "Filter.lessThan",
                &[
                    ("leftField", constant("CLOUDY_PIXEL_PERCENTAGE")),
                    ("rightValue", constant(max_cloud)),
                ],
            ),
        );
    }

    let newest_first = invoke(
        "Collection.limit",
        &[
            ("collection", collection),
            ("key", constant(TIME_START_KEY)),
            ("ascending", constant(false)),
        ],
    );
    let image = invoke("Collection.first", &[("collection", newest_first)]);

    let selected = invoke(
        "Image.select",
        &[
            ("input", reference("1")),
            ("bandSelectors", constant(json!(request.bands))),
        ],
    );
    let means = invoke(
        "Image.reduceRegion",
        &[
            ("image", selected),
            ("reducer", invoke("Reducer.mean", &[])),
            ("geometry", region),
            ("scale", constant(request.scale_m)),
            ("maxPixels", constant(MAX_PIXELS)),
        ],
    );
    let acquired = invoke(
        "Element.get",
        &[("object", reference("1")), ("property", constant(TIME_START_KEY))],
    );
    let result = invoke(
        "Dictionary.set",
        &[
            ("dictionary", means),
            ("key", constant(TIME_START_KEY)),
            ("value", acquired),
        ],
    );

    json!({
        "result": "0",
        "values": {
            "0": result,
            "1": image,
        }
    })
}

/// Expression counting at most one image of `collection`.
pub fn collection_probe(collection: &str) -> Value {
    let limited = invoke(
        "Collection.limit",
        &[
            ("collection", invoke("ImageCollection.load", &[("id", constant(collection))])),
            ("limit", constant(1)),
        ],
    );

    json!({
        "result": "0",
        "values": {
            "0": invoke("Collection.size", &[("collection", limited)]),
        }
    })
}
