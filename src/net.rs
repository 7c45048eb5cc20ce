//! TCP sink adapter.
//!
//! Each destination maps to a socket address from the configuration. The
//! connection starts with an infinite-length WAV header so stream players
//! recognize the format; raw canonical PCM frames follow. `write_frame`
//! blocks on the socket, which is exactly the backpressure the engine
//! expects from a sink.

use crate::audio::{AudioSink, DestinationId, SinkConnector};
use crate::config::DestinationRoute;
use crate::constants::{BIT_DEPTH, CHANNELS, SAMPLE_RATE};
use hound::{SampleFormat, WavSpec};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

pub struct TcpSinkConnector {
    routes: HashMap<u64, String>,
}

impl TcpSinkConnector {
    pub fn new(routes: &[DestinationRoute]) -> Self {
        let routes = routes
            .iter()
            .map(|route| (route.id, route.addr.clone()))
            .collect();

        TcpSinkConnector { routes }
    }
}

impl SinkConnector for TcpSinkConnector {
    fn connect(&self, destination: DestinationId) -> io::Result<Box<dyn AudioSink>> {
        let addr = self.routes.get(&destination.0).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no route configured for destination {destination}"),
            )
        })?;

        let mut stream = TcpStream::connect(addr.as_str())?;

        // Write the wav header to the stream using the hound crate.
        // This will allow players to recognize the stream as a wav file.
        let spec = WavSpec {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: BIT_DEPTH,
            sample_format: SampleFormat::Int,
        };
        let header = spec.into_header_for_infinite_file();
        stream.write_all(&header[..])?;

        info!("Connected sink for destination {destination} at {addr}");

        Ok(Box::new(TcpSink { stream }))
    }
}

struct TcpSink {
    stream: TcpStream,
}

impl AudioSink for TcpSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}
