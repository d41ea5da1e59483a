use hslab::{
    dtype::{ByteOrder, Datatype},
    error::{ObjectError, ShapeError, TransferError, TypeError},
    order::StoreVec,
    selection::Hyperslab,
    store::{AccessMode, DatasetCreateProps, Hid, ObjectKind, StoreError},
    value::Element,
    order::HostVec,
    AttrValue, Backend, Bound, ChunkSpec, CreateOptions, DatasetIo, Error, HostArray, HostKind,
    SlabRequest, ZarrBackend,
};
use ndarray::{arr1, arr2, ArrayD, IxDyn};
use num_complex::Complex64;
use std::{fmt::Debug, path::Path};

const SHAPES: [&[usize]; 5] = [&[], &[5], &[4, 3], &[2, 3, 4], &[2, 1, 3, 2]];

fn round_trip<T, F>(path: &Path, make: F)
where
    T: Element + PartialEq + Debug,
    F: Fn(usize) -> T,
{
    for (rank, shape) in SHAPES.iter().enumerate() {
        let mut n = 0;
        let array = ArrayD::from_shape_fn(IxDyn(shape), |_| {
            n += 1;
            make(n)
        });
        let name = format!("/{}/rank{rank}", T::KIND);
        hslab::write_dataset(path, &name, &HostArray::from(array.clone())).unwrap();
        let back = hslab::read_dataset(path, &name).unwrap();
        assert_eq!(back.kind(), T::KIND);
        assert_eq!(back.into_array::<T>(), Some(array), "{name}");
    }
}

#[test]
fn every_kind_and_rank_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kinds");
    round_trip(&path, |n| n as f64 * 0.5);
    round_trip(&path, |n| n as f32 - 10.0);
    round_trip(&path, |n| -(n as i8));
    round_trip(&path, |n| n as i16 * -300);
    round_trip(&path, |n| n as i32 * -70_000);
    round_trip(&path, |n| n as i64 * -5_000_000_000);
    round_trip(&path, |n| n as u8 + 200);
    round_trip(&path, |n| n as u16 * 1000);
    round_trip(&path, |n| n as u32 * 80_000_000);
    round_trip(&path, |n| n as u64 * 9_000_000_000);
    round_trip(&path, |n| Complex64::new(n as f64, -(n as f64) / 4.0));
}

#[test]
fn four_by_three_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("matrix");
    let shape = [Bound::Finite(4), Bound::Finite(3)];
    hslab::create_dataset(&path, "m", &shape, &CreateOptions::default()).unwrap();
    let a: ArrayD<f64> =
        arr2(&[[1., 2., 3.], [4., 5., 6.], [7., 8., 9.], [10., 11., 12.]]).into_dyn();
    hslab::write_dataset(&path, "m", &HostArray::from(a.clone())).unwrap();
    let back = hslab::read_dataset(&path, "m").unwrap();
    assert_eq!(back.shape(), &[4, 3]);
    assert_eq!(back.into_array::<f64>(), Some(a));

    // second row, 1-based
    let request = SlabRequest::from_host(&[2., 1.], &[1., 3.], None, None).unwrap();
    let row = hslab::read_dataset_slab(&path, "m", &request).unwrap();
    assert_eq!(row.into_array::<f64>(), Some(arr2(&[[4., 5., 6.]]).into_dyn()));

    // every other row of the last two columns
    let request = SlabRequest::from_host(&[1., 2.], &[0., 2.], Some(&[2., 1.][..]), None).unwrap();
    let part = hslab::read_dataset_slab(&path, "m", &request).unwrap();
    assert_eq!(part.into_array::<f64>(), Some(arr2(&[[2., 3.], [8., 9.]]).into_dyn()));
}

#[test]
fn zero_count_fills_on_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fill");
    let values: ArrayD<i32> = ArrayD::from_shape_fn(IxDyn(&[10]), |i| i[0] as i32);
    hslab::write_dataset(&path, "v", &HostArray::from(values)).unwrap();

    let request =
        SlabRequest::new(vec![2], vec![Bound::Finite(0)]).with_stride(vec![2]).with_block(vec![1]);
    let back = hslab::read_dataset_slab(&path, "v", &request).unwrap();
    assert_eq!(back.into_array::<i32>(), Some(arr1(&[2, 4, 6, 8]).into_dyn()));

    let data = HostArray::from(arr1(&[0, 0, 0, 0]).into_dyn());
    let err = hslab::write_dataset_slab(&path, "v", &data, &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::UnboundedCount { axis: 1 })));
}

#[test]
fn stride_below_block_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stride");
    let values: ArrayD<f64> = ArrayD::zeros(IxDyn(&[6, 6]));
    hslab::write_dataset(&path, "v", &HostArray::from(values)).unwrap();
    let request = SlabRequest::new(vec![0, 0], vec![Bound::Finite(1), Bound::Finite(100)])
        .with_stride(vec![2, 1])
        .with_block(vec![1, 2]);
    let err = hslab::read_dataset_slab(&path, "v", &request).unwrap_err();
    assert!(matches!(
        err,
        Error::Shape(ShapeError::StrideBelowBlock { axis: 2, stride: 1, block: 2 })
    ));
}

#[test]
fn writes_grow_within_the_maximum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grow");
    let options = CreateOptions::default()
        .with_datatype(HostKind::Int16)
        .with_chunks(ChunkSpec::Explicit(vec![2, 4]));
    hslab::create_dataset(&path, "g", &[Bound::Finite(2), Bound::Infinite], &options).unwrap();

    let block: ArrayD<i16> = arr2(&[[1, 2, 3], [4, 5, 6]]).into_dyn();
    let request = SlabRequest::new(vec![0, 5], vec![Bound::Finite(2), Bound::Finite(3)]);
    hslab::write_dataset_slab(&path, "g", &HostArray::from(block), &request).unwrap();
    let back = hslab::read_dataset(&path, "g").unwrap().into_array::<i16>().unwrap();
    assert_eq!(back.shape(), &[2, 8]);
    assert_eq!(back[IxDyn(&[1, 4])], 0);
    assert_eq!(back[IxDyn(&[1, 7])], 6);

    let row: ArrayD<i16> = arr2(&[[7, 8]]).into_dyn();
    let request = SlabRequest::new(vec![2, 0], vec![Bound::Finite(1), Bound::Finite(2)]);
    let err = hslab::write_dataset_slab(&path, "g", &HostArray::from(row), &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::ExceedsMaximum { axis: 1, max: 2, required: 3 })));
    let back = hslab::read_dataset(&path, "g").unwrap();
    assert_eq!(back.shape(), &[2, 8]);

    let short = HostArray::from(arr1(&[1i16]).into_dyn());
    let request = SlabRequest::new(vec![0, 0], vec![Bound::Finite(1), Bound::Finite(2)]);
    let err = hslab::write_dataset_slab(&path, "g", &short, &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::DataMismatch { data: 1, selected: 2 })));
}

#[test]
fn fixed_datasets_do_not_grow() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixed");
    hslab::write_dataset(&path, "f", &HostArray::from(arr1(&[1.0, 2.0]).into_dyn())).unwrap();
    let request = SlabRequest::new(vec![1], vec![Bound::Finite(2)]);
    let data = HostArray::from(arr1(&[3.0, 4.0]).into_dyn());
    let err = hslab::write_dataset_slab(&path, "f", &data, &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::ExceedsMaximum { .. })));
    let err = hslab::read_dataset_slab(&path, "f", &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::ExceedsExtent { extent: 2, required: 3, .. })));
}

#[test]
fn attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attrs");
    hslab::write_dataset(&path, "/d", &HostArray::scalar(1.0)).unwrap();

    hslab::write_attribute(&path, "/d", "scale", &AttrValue::from(0.5)).unwrap();
    hslab::write_attribute(&path, "/d", "count", &AttrValue::from(-3i32)).unwrap();
    hslab::write_attribute(&path, "/", "title", &AttrValue::from("run 7")).unwrap();
    hslab::write_attribute(&path, "/", "empty", &AttrValue::from("")).unwrap();

    let scale = hslab::read_attribute(&path, "/d", "scale").unwrap();
    assert_eq!(scale, AttrValue::from(0.5));
    // integers come back at full width
    let count = hslab::read_attribute(&path, "/d", "count").unwrap();
    assert_eq!(count, AttrValue::from(-3i64));
    let title = hslab::read_attribute(&path, "/", "title").unwrap();
    assert_eq!(title, AttrValue::Text("run 7".into()));
    let empty = hslab::read_attribute(&path, "/", "empty").unwrap();
    assert_eq!(empty, AttrValue::Text(String::new()));

    hslab::write_attribute(&path, "/d", "scale", &AttrValue::from("replaced")).unwrap();
    let scale = hslab::read_attribute(&path, "/d", "scale").unwrap();
    assert_eq!(scale, AttrValue::Text("replaced".into()));

    let err = hslab::write_attribute(&path, "/d", "z", &AttrValue::from(Complex64::new(1., 1.)))
        .unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::ComplexAttribute)));
    let vector = AttrValue::from(HostArray::from(arr1(&[1.0, 2.0]).into_dyn()));
    let err = hslab::write_attribute(&path, "/d", "v", &vector).unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::MatrixAttribute(2))));
    let err = hslab::write_attribute(&path, "/nope", "a", &AttrValue::from(1u8)).unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::NotFound(_))));

    hslab::delete_attribute(&path, "/d", "count").unwrap();
    let err = hslab::read_attribute(&path, "/d", "count").unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::AttributeNotFound { .. })));
    let err = hslab::delete_attribute(&path, "/d", "count").unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::AttributeNotFound { .. })));
}

#[test]
fn deleting_objects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("delete");
    hslab::write_dataset(&path, "/g/a", &HostArray::scalar(1u16)).unwrap();
    hslab::write_dataset(&path, "/g/b", &HostArray::scalar(2u16)).unwrap();
    hslab::delete_object(&path, "/g/a").unwrap();
    let err = hslab::read_dataset(&path, "/g/a").unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::NotFound(_))));
    assert_eq!(hslab::read_dataset(&path, "/g/b").unwrap(), HostArray::scalar(2u16));

    hslab::delete_object(&path, "/g").unwrap();
    let err = hslab::read_dataset(&path, "/g/b").unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::NotFound(_))));
    let err = hslab::delete_object(&path, "/g").unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::NotFound(_))));
}

#[test]
fn scalars_reject_selections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scalar");
    hslab::write_dataset(&path, "s", &HostArray::scalar(7i64)).unwrap();
    let back = hslab::read_dataset_slab(&path, "s", &SlabRequest::whole_scalar()).unwrap();
    assert_eq!(back, HostArray::scalar(7i64));
    let request = SlabRequest::new(vec![0], vec![Bound::Finite(1)]);
    let err = hslab::read_dataset_slab(&path, "s", &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::ScalarSelection)));
}

#[test]
fn half_floats_read_as_double() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half");
    let mut backend = ZarrBackend::new();
    let file = backend.create_container(&path).unwrap();
    let dtype = backend.create_type(&Datatype::float(2, ByteOrder::NATIVE)).unwrap();
    let space = backend.create_simple_space(&StoreVec::new(vec![2]), None).unwrap();
    let dset = backend
        .create_dataset(file, "half", dtype, space, &DatasetCreateProps::default())
        .unwrap();
    let mem = backend.create_type(&Datatype::float(8, ByteOrder::NATIVE)).unwrap();
    let bytes: Vec<u8> = [-2.5f64, 0.125].iter().flat_map(|v| v.to_ne_bytes()).collect();
    backend.write_dataset(dset, mem, None, None, &bytes).unwrap();
    for hid in [mem, dset, space, dtype, file] {
        backend.close(hid).unwrap();
    }

    let back = hslab::read_dataset(&path, "half").unwrap();
    assert_eq!(back.kind(), HostKind::Real64);
    assert_eq!(back.into_array::<f64>(), Some(arr1(&[-2.5, 0.125]).into_dyn()));
}

#[test]
fn oversized_hyperslabs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge");
    let options = CreateOptions::default().with_chunks(ChunkSpec::Auto);
    hslab::create_dataset(&path, "v", &[Bound::Infinite], &options).unwrap();

    let request = SlabRequest::new(vec![0], vec![Bound::Finite(u64::MAX / 2)])
        .with_stride(vec![3])
        .with_block(vec![3]);
    let err = hslab::write_dataset_slab(&path, "v", &HostArray::scalar(1.0), &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::SelectionTooLarge { axis: 1 })));
    let err = hslab::read_dataset_slab(&path, "v", &request).unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::SelectionTooLarge { axis: 1 })));
    assert_eq!(hslab::read_dataset(&path, "v").unwrap().shape(), &[0]);
}

#[test]
fn rejected_complex_write_keeps_the_extent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typed");
    let options = CreateOptions::default()
        .with_datatype(HostKind::Real64)
        .with_chunks(ChunkSpec::Explicit(vec![4]));
    hslab::create_dataset(&path, "v", &[Bound::Infinite], &options).unwrap();

    let data: ArrayD<Complex64> = arr1(&[Complex64::new(1., -1.); 6]).into_dyn();
    let request = SlabRequest::new(vec![2], vec![Bound::Finite(6)]);
    let err = hslab::write_dataset_slab(&path, "v", &HostArray::from(data), &request).unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::Mismatch { .. })));
    assert_eq!(hslab::read_dataset(&path, "v").unwrap().shape(), &[0]);
}

#[test]
fn auto_chunked_appends_cross_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("append");
    let options = CreateOptions::default().with_chunks(ChunkSpec::Auto);
    hslab::create_dataset(&path, "v", &[Bound::Infinite], &options).unwrap();
    let chunk = hslab::suggest_chunk_shape(&HostVec::new(vec![Bound::Infinite]), 8)[0];
    assert!(chunk >= 4);

    // up to one short of the first boundary, then across it
    let head: ArrayD<f64> = ArrayD::from_shape_fn(IxDyn(&[chunk as usize - 1]), |i| i[0] as f64);
    let request = SlabRequest::new(vec![0], vec![Bound::Finite(chunk - 1)]);
    hslab::write_dataset_slab(&path, "v", &HostArray::from(head), &request).unwrap();
    let across = HostArray::from(arr1(&[-1.0, -2.0, -3.0]).into_dyn());
    let request = SlabRequest::new(vec![chunk - 1], vec![Bound::Finite(3)]);
    hslab::write_dataset_slab(&path, "v", &across, &request).unwrap();

    // a strided tail into the third chunk leaves unwritten zeros between
    let tail = HostArray::from(arr1(&[7.0, 8.0]).into_dyn());
    let request =
        SlabRequest::new(vec![2 * chunk], vec![Bound::Finite(2)]).with_stride(vec![chunk / 2]);
    hslab::write_dataset_slab(&path, "v", &tail, &request).unwrap();

    let len = 2 * chunk + chunk / 2 + 1;
    let back = hslab::read_dataset(&path, "v").unwrap().into_array::<f64>().unwrap();
    assert_eq!(back.shape(), &[len as usize]);
    let at = |i: u64| back[IxDyn(&[i as usize])];
    assert_eq!(at(0), 0.0);
    assert_eq!(at(chunk - 2), (chunk - 2) as f64);
    assert_eq!((at(chunk - 1), at(chunk), at(chunk + 1)), (-1.0, -2.0, -3.0));
    assert_eq!(at(chunk + 2), 0.0);
    assert_eq!(at(2 * chunk), 7.0);
    assert_eq!(at(2 * chunk + 1), 0.0);
    assert_eq!(at(len - 1), 8.0);

    let request = SlabRequest::new(vec![chunk - 2], vec![Bound::Finite(4)]);
    let part = hslab::read_dataset_slab(&path, "v", &request).unwrap();
    assert_eq!(
        part.into_array::<f64>(),
        Some(arr1(&[(chunk - 2) as f64, -1.0, -2.0, -3.0]).into_dyn())
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Open(Hid),
    Close(Hid),
}

/// Records handle traffic and fails one primitive on demand.
struct Recording {
    inner: ZarrBackend,
    events: Vec<Event>,
    fail_on: Option<&'static str>,
}

impl Recording {
    fn new(fail_on: Option<&'static str>) -> Self {
        Self { inner: ZarrBackend::new(), events: Vec::new(), fail_on }
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.fail_on == Some(op) {
            Err(StoreError::Metadata("injected failure".into()))
        } else {
            Ok(())
        }
    }

    fn assert_released_in_reverse(&self) {
        let opened: Vec<Hid> = self
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Open(hid) => Some(*hid),
                Event::Close(_) => None,
            })
            .collect();
        let closed: Vec<Hid> = self
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Close(hid) => Some(*hid),
                Event::Open(_) => None,
            })
            .collect();
        assert!(!opened.is_empty());
        assert_eq!(closed, opened.into_iter().rev().collect::<Vec<_>>());
        assert_eq!(self.inner.open_handles(), 0);
    }
}

macro_rules! open {
    ($self:ident, $op:literal, $call:expr) => {{
        $self.check($op)?;
        let hid = $call?;
        $self.events.push(Event::Open(hid));
        Ok(hid)
    }};
}

macro_rules! pass {
    ($self:ident, $op:literal, $call:expr) => {{
        $self.check($op)?;
        $call
    }};
}

impl Backend for Recording {
    fn error_reporting(&self) -> bool {
        self.inner.error_reporting()
    }

    fn set_error_reporting(&mut self, on: bool) {
        self.inner.set_error_reporting(on);
    }

    fn native_order(&self) -> ByteOrder {
        self.inner.native_order()
    }

    fn is_container(&mut self, path: &Path) -> Result<bool, StoreError> {
        pass!(self, "is_container", self.inner.is_container(path))
    }

    fn create_container(&mut self, path: &Path) -> Result<Hid, StoreError> {
        open!(self, "create_container", self.inner.create_container(path))
    }

    fn open_container(&mut self, path: &Path, mode: AccessMode) -> Result<Hid, StoreError> {
        open!(self, "open_container", self.inner.open_container(path, mode))
    }

    fn link_exists(&mut self, loc: Hid, name: &str) -> Result<bool, StoreError> {
        pass!(self, "link_exists", self.inner.link_exists(loc, name))
    }

    fn open_object(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError> {
        open!(self, "open_object", self.inner.open_object(loc, name))
    }

    fn object_kind(&mut self, obj: Hid) -> Result<ObjectKind, StoreError> {
        pass!(self, "object_kind", self.inner.object_kind(obj))
    }

    fn delete_link(&mut self, loc: Hid, name: &str) -> Result<(), StoreError> {
        pass!(self, "delete_link", self.inner.delete_link(loc, name))
    }

    fn create_dataset(
        &mut self,
        loc: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
        props: &DatasetCreateProps,
    ) -> Result<Hid, StoreError> {
        open!(self, "create_dataset", self.inner.create_dataset(loc, name, dtype, space, props))
    }

    fn open_dataset(&mut self, loc: Hid, name: &str) -> Result<Hid, StoreError> {
        open!(self, "open_dataset", self.inner.open_dataset(loc, name))
    }

    fn dataset_space(&mut self, dset: Hid) -> Result<Hid, StoreError> {
        open!(self, "dataset_space", self.inner.dataset_space(dset))
    }

    fn dataset_type(&mut self, dset: Hid) -> Result<Hid, StoreError> {
        open!(self, "dataset_type", self.inner.dataset_type(dset))
    }

    fn set_extent(&mut self, dset: Hid, dims: &StoreVec<u64>) -> Result<(), StoreError> {
        pass!(self, "set_extent", self.inner.set_extent(dset, dims))
    }

    fn read_dataset(
        &mut self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &mut [u8],
    ) -> Result<(), StoreError> {
        pass!(self, "read_dataset", self.inner.read_dataset(dset, mem_type, mem_space, file_space, buf))
    }

    fn write_dataset(
        &mut self,
        dset: Hid,
        mem_type: Hid,
        mem_space: Option<Hid>,
        file_space: Option<Hid>,
        buf: &[u8],
    ) -> Result<(), StoreError> {
        pass!(
            self,
            "write_dataset",
            self.inner.write_dataset(dset, mem_type, mem_space, file_space, buf)
        )
    }

    fn create_scalar_space(&mut self) -> Result<Hid, StoreError> {
        open!(self, "create_scalar_space", self.inner.create_scalar_space())
    }

    fn create_simple_space(
        &mut self,
        dims: &StoreVec<u64>,
        max: Option<&StoreVec<Bound>>,
    ) -> Result<Hid, StoreError> {
        open!(self, "create_simple_space", self.inner.create_simple_space(dims, max))
    }

    fn space_extent(
        &mut self,
        space: Hid,
    ) -> Result<(StoreVec<u64>, StoreVec<Bound>), StoreError> {
        pass!(self, "space_extent", self.inner.space_extent(space))
    }

    fn select_hyperslab(&mut self, space: Hid, slab: &Hyperslab) -> Result<(), StoreError> {
        pass!(self, "select_hyperslab", self.inner.select_hyperslab(space, slab))
    }

    fn selection_valid(&mut self, space: Hid) -> Result<bool, StoreError> {
        pass!(self, "selection_valid", self.inner.selection_valid(space))
    }

    fn create_type(&mut self, dtype: &Datatype) -> Result<Hid, StoreError> {
        open!(self, "create_type", self.inner.create_type(dtype))
    }

    fn type_descriptor(&mut self, dtype: Hid) -> Result<Datatype, StoreError> {
        pass!(self, "type_descriptor", self.inner.type_descriptor(dtype))
    }

    fn attribute_exists(&mut self, obj: Hid, name: &str) -> Result<bool, StoreError> {
        pass!(self, "attribute_exists", self.inner.attribute_exists(obj, name))
    }

    fn create_attribute(
        &mut self,
        obj: Hid,
        name: &str,
        dtype: Hid,
        space: Hid,
    ) -> Result<Hid, StoreError> {
        open!(self, "create_attribute", self.inner.create_attribute(obj, name, dtype, space))
    }

    fn open_attribute(&mut self, obj: Hid, name: &str) -> Result<Hid, StoreError> {
        open!(self, "open_attribute", self.inner.open_attribute(obj, name))
    }

    fn attribute_type(&mut self, attr: Hid) -> Result<Hid, StoreError> {
        open!(self, "attribute_type", self.inner.attribute_type(attr))
    }

    fn attribute_space(&mut self, attr: Hid) -> Result<Hid, StoreError> {
        open!(self, "attribute_space", self.inner.attribute_space(attr))
    }

    fn read_attribute(&mut self, attr: Hid, mem_type: Hid, buf: &mut [u8]) -> Result<(), StoreError> {
        pass!(self, "read_attribute", self.inner.read_attribute(attr, mem_type, buf))
    }

    fn write_attribute(&mut self, attr: Hid, mem_type: Hid, buf: &[u8]) -> Result<(), StoreError> {
        pass!(self, "write_attribute", self.inner.write_attribute(attr, mem_type, buf))
    }

    fn delete_attribute(&mut self, obj: Hid, name: &str) -> Result<(), StoreError> {
        pass!(self, "delete_attribute", self.inner.delete_attribute(obj, name))
    }

    fn is_valid(&self, hid: Hid) -> bool {
        self.inner.is_valid(hid)
    }

    fn close(&mut self, hid: Hid) -> Result<(), StoreError> {
        self.inner.close(hid)?;
        self.events.push(Event::Close(hid));
        Ok(())
    }
}

fn prepared(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("recorded");
    let data: ArrayD<f64> = arr2(&[[1., 2.], [3., 4.]]).into_dyn();
    hslab::write_dataset(&path, "/x", &HostArray::from(data)).unwrap();
    hslab::write_attribute(&path, "/x", "unit", &AttrValue::from("m")).unwrap();
    path
}

#[test]
fn handles_are_released_in_reverse_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = prepared(dir.path());

    let mut io = DatasetIo::with_backend(Recording::new(None));
    let back = io.read_dataset(&path, "/x").unwrap();
    assert_eq!(back.shape(), &[2, 2]);
    io.backend().assert_released_in_reverse();

    let mut io = DatasetIo::with_backend(Recording::new(None));
    let unit = io.read_attribute(&path, "/x", "unit").unwrap();
    assert_eq!(unit, AttrValue::Text("m".into()));
    io.backend().assert_released_in_reverse();
}

#[test]
fn failures_release_what_was_acquired() {
    let dir = tempfile::tempdir().unwrap();
    let path = prepared(dir.path());

    let mut io = DatasetIo::with_backend(Recording::new(Some("create_type")));
    let err = io.read_dataset(&path, "/x").unwrap_err();
    assert!(matches!(err, Error::Type(TypeError::Store(_))));
    io.backend().assert_released_in_reverse();

    let mut io = DatasetIo::with_backend(Recording::new(Some("read_dataset")));
    let request = SlabRequest::new(vec![0, 0], vec![Bound::Infinite, Bound::Finite(1)]);
    let err = io.read_dataset_slab(&path, "/x", &request).unwrap_err();
    assert!(matches!(err, Error::Transfer(TransferError::Read { .. })));
    io.backend().assert_released_in_reverse();

    let mut io = DatasetIo::with_backend(Recording::new(Some("create_attribute")));
    let err = io.write_attribute(&path, "/x", "unit", &AttrValue::from("s")).unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::Create { .. })));
    io.backend().assert_released_in_reverse();

    let mut io = DatasetIo::with_backend(Recording::new(Some("dataset_space")));
    let err = io.write_dataset(&path, "/x", &HostArray::scalar(1.0)).unwrap_err();
    assert!(matches!(err, Error::Object(ObjectError::Open { .. })));
    io.backend().assert_released_in_reverse();
}
