mod common;

use common::*;
use detection_client::application::codec::ResultImage;

#[test]
fn both_wire_shapes_decode_to_the_same_result() {
    let codec = DetectionCodec::default();
    let image = png_bytes();

    let structured = codec
        .decode_response(&structured_response(2, 0.87, 1.23, &[], &image))
        .expect("variant A decodes");
    let binary = codec
        .decode_response(&binary_response(true, 2, "0.870", "1.230", image.clone()))
        .expect("variant B decodes");

    assert_eq!(structured.result, binary.result);
    assert!(structured.result.found);
    assert_eq!(structured.result.count, 2);
    assert_eq!(structured.result.top_confidence, 0.87);
    assert_eq!(structured.result.processing_time_seconds, 1.23);
    assert_eq!(structured.image, binary.image);
    assert!(matches!(binary.image, ResultImage::Annotated { ref bytes, .. } if *bytes == image));
}

#[test]
fn labels_only_exist_in_the_structured_shape() {
    let codec = DetectionCodec::default();

    let structured = codec
        .decode_response(&structured_response(
            2,
            0.87,
            1.23,
            &[("coyote", 0.87), ("coyote", 0.52)],
            &png_bytes(),
        ))
        .expect("variant A decodes");
    let binary = codec
        .decode_response(&binary_response(true, 2, "0.870", "1.230", png_bytes()))
        .expect("variant B decodes");

    assert_eq!(structured.result.detections.len(), 2);
    assert!(binary.result.detections.is_empty());

    let mut without_labels = structured.result.clone();
    without_labels.detections.clear();
    assert_eq!(without_labels, binary.result);
    assert_eq!(
        structured.result.summary(),
        "2 detection(s), top confidence 0.87 (1.23s): 2 coyote"
    );
}

#[test]
fn content_type_parameters_do_not_matter() {
    let codec = DetectionCodec::new(ResponseProtocol::Binary);
    let mut raw = structured_response(1, 0.5, 0.1, &[("dog", 0.5)], &png_bytes());
    raw.headers
        .insert("content-type".into(), "Application/JSON; charset=utf-8".into());

    let decoded = codec.decode_response(&raw).expect("JSON recognised despite protocol setting");
    assert_eq!(decoded.result.detections[0].label, "dog");
}
