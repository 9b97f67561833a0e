use criterion::{Criterion, black_box};
use gse_buffer::VirtualFragment;
use std::{env, time::Duration};

/// 基准：一个 PDU 从创建到被拆成两段并全部释放的完整成本。
///
/// # 逻辑解析（How）
/// - 每轮创建 1500 字节容量的分片并拷贝负载；
/// - 拆出首个 500 字节分片，前移父分片跳过已拆出的部分；
/// - 在首个分片前暴露头部空间写入 4 字节头部，随后依次释放两个视图。
fn bench_vfrag_split(c: &mut Criterion) {
    let payload = vec![0xA5u8; 1500];
    c.bench_function("vfrag_split", |b| {
        b.iter(|| {
            let mut pdu = VirtualFragment::create_with_data(payload.len(), &payload).unwrap();
            let mut first = pdu.duplicate(500).unwrap();
            pdu.shift(500, 0);
            first.rewind(4, 0);
            first.bytes_mut()[..4].copy_from_slice(&[0xC0, 0x01, 0xF4, 0x00]);
            black_box(first.len() + pdu.len());
            first.release().unwrap();
            pdu.release().unwrap();
        });
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_vfrag_split(&mut criterion);
    criterion.final_summary();
}
