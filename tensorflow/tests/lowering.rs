#[macro_use]
extern crate log;

mod utils;

use tessel_core::internal::*;
use tessel_tensorflow::errors::ImportError;
use tessel_tensorflow::graph::build_graph;
use tessel_tensorflow::tfpb::*;

use crate::utils::*;

fn conv_bias_relu() -> tensorflow::GraphDef {
    graph()
        .node(node().name("input").op("Placeholder").attr("shape", shape(&[1, 224, 224, 3])))
        .node(konst("weights", tensor_f32(&[3, 3, 3, 8], vec![0.25])))
        .node(
            node()
                .name("conv")
                .op("Conv2D")
                .input("input")
                .input("weights")
                .attr("strides", vec![1i64, 1, 1, 1])
                .attr("padding", "SAME"),
        )
        .node(konst("bias", tensor_f32(&[8], vec![0.5])))
        .node(node().name("bias_add").op("BiasAdd").input("conv").input("bias"))
        .node(node().name("relu").op("Relu").input("bias_add"))
}

#[test]
fn conv_with_fused_bias() {
    let model = import(&conv_bias_relu()).unwrap();
    trace!("{:?}", model);
    let names: Vec<&str> = model.nodes.iter().map(|n| &*n.name).collect();
    assert_eq!(names, vec!["input", "conv", "relu"]);
    assert_eq!(&*model.tensor_by_name("input").unwrap().shape, &[1, 3, 224, 224]);
    assert_eq!(input_names(&model, "conv"), vec!["input", "weights", "bias"]);
    assert_eq!(&*model.tensor_by_name("weights").unwrap().shape, &[8, 3, 3, 3]);
    let OpParams::Conv(conv) = op_of(&model, "conv").params else { panic!() };
    assert_eq!((conv.pad_h, conv.pad_w), (PAD_SAME, PAD_SAME));
    assert_eq!(conv.output_channel, 8);
    assert_eq!(input_names(&model, "relu"), vec!["conv"]);
    let relu = model.node_by_name("relu").unwrap();
    assert_eq!(model.outputs, vec![relu.id]);
    assert_eq!(model.inputs, vec![model.node_by_name("input").unwrap().id]);
}

#[test]
fn unknown_op_is_refused() {
    let g = graph()
        .node(node().name("x").op("Placeholder"))
        .node(node().name("f").op("Frobnicate").input("x"));
    let err = import(&g).unwrap_err();
    match err.downcast_ref::<ImportError>() {
        Some(ImportError::MissingTranslator { op, node }) => {
            assert_eq!(op, "Frobnicate");
            assert_eq!(node, "f");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn allowlisted_ops_are_generic() {
    let g = graph()
        .node(node().name("x").op("Placeholder"))
        .node(node().name("f").op("Frobnicate").input("x"))
        .node(node().name("wav").op("DecodeWav").input("f"))
        .node(node().name("r").op("Relu").input("wav"));
    let mut tf = tessel_tensorflow::tensorflow();
    tf.op_register.allow_generic("Frobnicate");
    let model = tf.model_for_graph_def(&g).unwrap();
    assert_eq!(op_of(&model, "wav").name, "Generic");
    assert_eq!(
        op_of(&model, "wav").params,
        OpParams::Generic(GenericParams::new("DecodeWav".to_string(), 1, 1))
    );
    assert_eq!(input_names(&model, "wav"), vec!["f"]);
}

#[test]
fn dangling_reference() {
    let g = graph()
        .node(node().name("x").op("Placeholder"))
        .node(node().name("r").op("Relu").input("ghost:1"));
    let err = import(&g).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ImportError>(),
        Some(&ImportError::Resolution { reference: "ghost:1".into(), node: "r".into() })
    );
    assert!(build_graph(&g).is_err());
}

#[test]
fn one_edge_per_reference() {
    let g = graph()
        .node(node().name("x").op("Placeholder"))
        .node(node().name("y").op("Relu").input("x:0"))
        .node(node().name("z").op("Add").input("x").input("y").input("^x"));
    let tf = build_graph(&g).unwrap();
    assert_eq!(tf.len(), 3);
    assert_eq!(tf.edge_count(), 4);
    assert_eq!(tf.node_by_name("x").unwrap().outputs.len(), 3);
}

#[test]
fn bytes_and_files() {
    let g = conv_bias_relu();
    let bytes = g.write_to_bytes().unwrap();
    let from_read = tessel_tensorflow::tensorflow().model_for_read(&mut &*bytes).unwrap();
    assert_eq!(from_read.nodes.len(), 3);

    let path = std::env::temp_dir().join(format!("tessel-conv-{}.pb", std::process::id()));
    g.save_to(&path).unwrap();
    let from_file = tessel_tensorflow::tensorflow().model_for_path(&path);
    std::fs::remove_file(&path).unwrap();
    let from_file = from_file.unwrap();
    assert!(from_file.name.starts_with("tessel-conv-"));
    assert_eq!(from_file.nodes.len(), 3);
}

#[test]
fn constants_are_padded_and_truncated() {
    let g = graph()
        .node(node().name("x").op("Placeholder").attr("shape", shape(&[2, 3])))
        .node(konst("short", tensor_f32(&[2, 3], vec![1.0, 2.0])))
        .node(node().name("a").op("Mul").input("x").input("short"))
        .node(konst("long", tensor_i32(&[3], vec![1, 2, 3, 4, 5])))
        .node(node().name("b").op("Sub").input("a").input("long"));
    let model = import(&g).unwrap();
    let short = model.tensor_by_name("short").unwrap();
    assert_eq!(short.layout, Some(Layout::HW));
    let short = short.to_tensor().unwrap();
    assert_eq!(short.as_vec::<f32>().unwrap(), vec![1.0, 2.0, 2.0, 2.0, 2.0, 2.0]);
    let long = model.tensor_by_name("long").unwrap();
    assert_eq!(long.layout, Some(Layout::W));
    assert_eq!(long.to_tensor().unwrap().as_vec::<i32>().unwrap(), vec![1, 2, 3]);
}

#[test]
fn reshaped_placeholder_is_channel_first() {
    let g = graph()
        .node(node().name("x").op("Placeholder").attr("shape", shape(&[-1, 784])))
        .node(konst("dims", tensor_i32(&[4], vec![-1, 28, 28, 1])))
        .node(node().name("img").op("Reshape").input("x").input("dims"))
        .node(node().name("r").op("Relu").input("img"));
    let model = import(&g).unwrap();
    assert_eq!(model.nodes.len(), 2);
    assert_eq!(&*model.tensor_by_name("x").unwrap().shape, &[1, 1, 28, 28]);
    assert_eq!(input_names(&model, "r"), vec!["x"]);
}

#[test]
fn placeholder_types() {
    let g = graph()
        .node(
            node()
                .name("ids")
                .op("Placeholder")
                .attr("shape", shape(&[1, 49, 10]))
                .attr("dtype", tensorflow::DataType::DtInt32),
        )
        .node(node().name("r").op("Relu").input("ids"));
    let model = import(&g).unwrap();
    let ids = model.tensor_by_name("ids").unwrap();
    assert_eq!(&*ids.shape, &[1, 10, 49]);
    assert_eq!(ids.datum_type, DatumType::I32);
}
