use crate::config::InferenceConfig;
use crate::tensor::OutputTensor;
use inference_proto::{inference_service_client::InferenceServiceClient, InferRequest, Tensor};
use ndarray::{Array, Ix4};
use thiserror::Error;
use tokio::{
    sync::Mutex,
    time::{sleep, timeout, Duration},
};
use tonic::{
    async_trait,
    transport::{Channel, Error},
    Request, Status,
};
use tracing::instrument;

/// Tensor name the backend expects the model input under.
pub const INPUT_TENSOR_NAME: &str = "input";

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to connect to gRPC server: {0}")]
    ConnectionFailed(#[from] Error),
    #[error("Maximum connection retries exceeded.")]
    MaxRetriesExceeded,
    #[error("gRPC request failed: {0}")]
    GrpcRequestFailed(#[from] Status),
    #[error("inference reply carried no output tensor")]
    MissingOutput,
}

/// The one external collaborator of the request pipeline. Injected so the
/// routes never touch process-wide state and tests can stand in a double.
#[async_trait]
pub trait InferenceGateway: Send + Sync + 'static {
    async fn infer(&self, input: Array<f32, Ix4>) -> Result<OutputTensor, InferenceError>;
}

pub struct GrpcInferenceGateway {
    client: Mutex<InferenceServiceClient<Channel>>,
    model_name: String,
}

impl GrpcInferenceGateway {
    pub async fn connect(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = Self::get_client(config.get_address()).await?;

        Ok(Self {
            client: Mutex::new(client),
            model_name: config.model_name.clone(),
        })
    }

    async fn get_client(
        address: String,
    ) -> Result<InferenceServiceClient<Channel>, InferenceError> {
        let mut retry_delay = Duration::from_millis(50);
        let max_retry_delay = Duration::from_secs(1);
        let max_retries = 10;
        let mut retry_count = 0;

        while retry_count < max_retries {
            match timeout(
                Duration::from_secs(1),
                InferenceServiceClient::connect(address.clone()),
            )
            .await
            {
                Ok(Ok(client)) => return Ok(client),
                Ok(Err(e)) => {
                    tracing::error!("Failed to connect to gRPC server: {:?}", e);
                }
                Err(_) => {
                    tracing::error!("Connection timeout");
                }
            }

            retry_count += 1;
            let jitter = rand::random::<f32>() * 0.2 + 0.9;
            sleep(retry_delay.mul_f32(jitter)).await;
            retry_delay = (retry_delay * 2).min(max_retry_delay);
        }

        Err(InferenceError::MaxRetriesExceeded)
    }
}

#[async_trait]
impl InferenceGateway for GrpcInferenceGateway {
    #[instrument(skip(self, input))]
    async fn infer(&self, input: Array<f32, Ix4>) -> Result<OutputTensor, InferenceError> {
        let shape = input.shape().iter().map(|&d| d as i64).collect();
        let (data, _) = input.into_raw_vec_and_offset();

        let request = Request::new(InferRequest {
            model_name: self.model_name.clone(),
            input: Some(Tensor {
                name: INPUT_TENSOR_NAME.to_string(),
                shape,
                data,
            }),
        });

        // The round trip carries no deadline and is never retried; a slow
        // backend stalls the request.
        let mut client = self.client.lock().await;
        let reply = client.infer(request).await?.into_inner();
        drop(client);

        let output = reply.output.ok_or(InferenceError::MissingOutput)?;
        let shape = output.shape.iter().map(|&d| d.max(0) as usize).collect();

        Ok(OutputTensor::new(shape, output.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_proto::inference_service_server::{InferenceService, InferenceServiceServer};
    use inference_proto::InferReply;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::Response;

    struct FixedBackend;

    #[async_trait]
    impl InferenceService for FixedBackend {
        async fn infer(
            &self,
            request: Request<InferRequest>,
        ) -> Result<Response<InferReply>, Status> {
            let request = request.into_inner();
            assert_eq!(request.model_name, "test-model");

            let input = request.input.ok_or(Status::invalid_argument("no input"))?;
            assert_eq!(input.name, INPUT_TENSOR_NAME);
            assert_eq!(input.shape, vec![1, 3, 640, 640]);
            assert_eq!(input.data.len(), 3 * 640 * 640);

            Ok(Response::new(InferReply {
                output: Some(Tensor {
                    name: "output".to_string(),
                    shape: vec![1, 1, 6],
                    data: vec![100., 100., 40., 60., 0.9, 0.],
                }),
            }))
        }
    }

    #[tokio::test]
    async fn round_trip_against_loopback_backend() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(
                    InferenceServiceServer::new(FixedBackend)
                        .max_decoding_message_size(usize::MAX),
                )
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .unwrap();
        });

        let config = InferenceConfig {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            model_name: "test-model".to_string(),
        };

        let gateway = GrpcInferenceGateway::connect(&config).await.unwrap();
        let output = gateway.infer(Array::zeros((1, 3, 640, 640))).await.unwrap();

        let rows: Vec<&[f32]> = output.rows().collect();
        assert_eq!(rows, vec![&[100.0f32, 100., 40., 60., 0.9, 0.][..]]);
    }
}
