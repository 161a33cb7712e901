use proptest::prelude::*;
use shadeflow::graph::{Graph, SocketId};
use shadeflow::socket::{SocketType, SocketValue};
use shadeflow::unlinked::{
    check_partition, resolve_unlinked, ConstantNodeInserter, LoaderNodeInserter, NodeKindGrouper,
    SocketGrouper, UnlinkedInput, UnlinkedInputsGrouper, UnlinkedInputsInserter, ValueGrouper,
};

fn value_strategy() -> impl Strategy<Value = SocketValue> {
    // Few distinct values so groups actually share.
    prop_oneof![
        (0i32..3).prop_map(|v| SocketValue::Float(v as f32)),
        (0i32..3).prop_map(SocketValue::Int),
        (0i32..2).prop_map(|v| SocketValue::Vector([v as f32; 3])),
        (0i32..2).prop_map(|v| SocketValue::Color([0.0, v as f32, 0.0])),
    ]
}

fn inputs_strategy() -> impl Strategy<Value = Vec<UnlinkedInput>> {
    prop::collection::vec((value_strategy(), 0usize..3, 0usize..2), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (value, kind, socket))| UnlinkedInput {
                socket: SocketId(i),
                ty: value.value_type(),
                default: value,
                node_kind: format!("kind{kind}"),
                socket_name: format!("socket{socket}"),
            })
            .collect()
    })
}

fn groupers() -> [(&'static str, Box<dyn UnlinkedInputsGrouper>); 3] {
    [
        ("value", Box::new(ValueGrouper)),
        ("socket", Box::new(SocketGrouper)),
        ("kind", Box::new(NodeKindGrouper)),
    ]
}

fn inserters() -> [(&'static str, Box<dyn UnlinkedInputsInserter>); 2] {
    [
        ("constant", Box::new(ConstantNodeInserter)),
        ("loader", Box::new(LoaderNodeInserter)),
    ]
}

proptest! {
    #[test]
    fn groupers_partition_exactly(inputs in inputs_strategy()) {
        for (name, grouper) in groupers() {
            let groups = grouper.group(&inputs);
            prop_assert!(check_partition(&groups, inputs.len()).is_ok(), "{}", name);
            for group in &groups {
                // Members in input order, and one type per group.
                prop_assert!(group.windows(2).all(|w| w[0] < w[1]), "{}", name);
                let ty = inputs[group[0]].ty;
                prop_assert!(group.iter().all(|&i| inputs[i].ty == ty), "{}", name);
            }
        }
    }

    #[test]
    fn value_groups_hold_equal_values(inputs in inputs_strategy()) {
        let groups = ValueGrouper.group(&inputs);
        for group in &groups {
            let key = inputs[group[0]].default.key();
            prop_assert!(group.iter().all(|&i| inputs[i].default.key() == key));
        }
        // Distinct groups hold distinct values.
        let mut keys: Vec<_> = groups.iter().map(|g| inputs[g[0]].default.key()).collect();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), groups.len());
    }

    #[test]
    fn origins_follow_input_order(inputs in inputs_strategy()) {
        for (grouper_name, grouper) in groupers() {
            for (inserter_name, inserter) in inserters() {
                let mut graph = Graph::new();
                let groups = grouper.group(&inputs);
                let origins =
                    resolve_unlinked(&mut graph, &inputs, grouper.as_ref(), inserter.as_ref())
                        .unwrap();
                prop_assert_eq!(origins.len(), inputs.len());

                let mut distinct = origins.clone();
                distinct.sort();
                distinct.dedup();
                prop_assert_eq!(
                    distinct.len(),
                    groups.len(),
                    "{}/{}",
                    grouper_name,
                    inserter_name
                );

                for group in &groups {
                    let origin = origins[group[0]];
                    prop_assert!(group.iter().all(|&i| origins[i] == origin));
                    let socket = graph.socket(origin).unwrap();
                    prop_assert_eq!(socket.ty, inputs[group[0]].ty);
                }
            }
        }
    }

    #[test]
    fn loader_makes_at_most_one_node(inputs in inputs_strategy()) {
        let mut graph = Graph::new();
        resolve_unlinked(&mut graph, &inputs, &SocketGrouper, &LoaderNodeInserter).unwrap();
        let expected = usize::from(!inputs.is_empty());
        prop_assert_eq!(graph.nodes().len(), expected);
    }
}

#[test]
fn zero_signs_do_not_share() {
    let inputs: Vec<_> = [0.0f32, -0.0]
        .iter()
        .enumerate()
        .map(|(i, &v)| UnlinkedInput {
            socket: SocketId(i),
            ty: SocketType::Float,
            default: SocketValue::Float(v),
            node_kind: "k".to_string(),
            socket_name: "s".to_string(),
        })
        .collect();
    assert_eq!(ValueGrouper.group(&inputs).len(), 2);
}
