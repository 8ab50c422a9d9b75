//! Tests for the TCP balancer client against an in-process balancer.

use balancer::codec::{read_message, write_message};
use balancer::{
    BalancerClient, BalancerError, GroupInfoResponse, GroupStatus, GroupWeightsResponse,
    GroupWithWeight, Message, SizedGroups, TcpBalancerClient,
};
use corelib::group::groups;
use corelib::GroupId;
use tokio::net::TcpListener;

/// Serve a single connection, answering with `respond(request)`.
async fn serve_once<F>(respond: F) -> String
where
    F: FnOnce(Message) -> Message + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_message(&mut socket).await.unwrap();
        write_message(&mut socket, &respond(request)).await.unwrap();
    });
    addr
}

fn weights_for(stamp: u64) -> GroupWeightsResponse {
    GroupWeightsResponse {
        stamp,
        info: vec![SizedGroups {
            size: 1_048_576,
            weighted_groups: vec![GroupWithWeight {
                group_ids: vec![4, 5],
                weight: 100,
            }],
        }],
    }
}

#[tokio::test]
async fn test_group_weights_round_trip() {
    let addr = serve_once(|request| match request {
        Message::GroupWeightsRequest(req) => Message::GroupWeightsResponse(weights_for(req.stamp)),
        other => panic!("unexpected request {:?}", other),
    })
    .await;

    let client = TcpBalancerClient::new(addr);
    let resp = client.group_weights(7).await.unwrap();
    assert_eq!(resp.stamp, 7);

    let snapshot = resp.into_snapshot().unwrap();
    let class = snapshot.class_for_size(2048);
    assert_eq!(class.entries[0].group_ids, groups(&[4, 5]));
}

#[tokio::test]
async fn test_group_weights_stamp_mismatch() {
    let addr = serve_once(|_| Message::GroupWeightsResponse(weights_for(3))).await;

    let client = TcpBalancerClient::new(addr);
    let err = client.group_weights(5).await.unwrap_err();
    assert!(matches!(
        err,
        BalancerError::StampMismatch {
            sent: 5,
            received: 3
        }
    ));
}

#[tokio::test]
async fn test_group_weights_unexpected_message() {
    let addr = serve_once(|_| {
        Message::GroupInfoResponse(GroupInfoResponse {
            nodes: vec![],
            couples: vec![],
            status: GroupStatus::Bad,
        })
    })
    .await;

    let client = TcpBalancerClient::new(addr);
    let err = client.group_weights(1).await.unwrap_err();
    assert!(matches!(err, BalancerError::UnexpectedMessage { .. }));
}

#[tokio::test]
async fn test_group_info_round_trip() {
    let addr = serve_once(|request| match request {
        Message::GroupInfoRequest(req) => Message::GroupInfoResponse(GroupInfoResponse {
            nodes: vec!["10.0.0.1:1025".to_string()],
            couples: vec![req.group, GroupId(req.group.0 + 1)],
            status: GroupStatus::Coupled,
        }),
        other => panic!("unexpected request {:?}", other),
    })
    .await;

    let client = TcpBalancerClient::new(addr);
    let info = client.group_info(GroupId(12)).await.unwrap();
    assert_eq!(info.couples, groups(&[12, 13]));
    assert_eq!(info.status, GroupStatus::Coupled);
    assert_eq!(info.nodes.len(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_io_error() {
    // Bind then drop to obtain a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = TcpBalancerClient::new(addr);
    let err = client.group_weights(1).await.unwrap_err();
    assert!(matches!(err, BalancerError::Io(_)));
}
