use glam::Vec3;
use pretty_assertions::assert_eq;
use ragekit::prelude::*;
use tempfile::tempdir;

/// A small but complete drawable: one skinned-less triangle geometry,
/// a shader group with an embedded texture, a two-bone skeleton, and one
/// rotation-limit joint.
const YDR_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Drawable>
  <Name>prop_test</Name>
  <BoundingSphereCenter x="0.5" y="0.5" z="0" />
  <BoundingSphereRadius value="0.7071068" />
  <BoundingBoxMin x="0" y="0" z="0" />
  <BoundingBoxMax x="1" y="1" z="0" />
  <LodDistHigh value="450" />
  <LodDistMed value="9998" />
  <LodDistLow value="9998" />
  <LodDistVlow value="9998" />
  <FlagsHigh value="1" />
  <FlagsMed value="0" />
  <FlagsLow value="0" />
  <FlagsVlow value="0" />
  <Unknown9A value="0" />
  <ShaderGroup>
    <Unknown30 value="0" />
    <TextureDictionary>
      <Item>
        <Name>prop_test_diff</Name>
        <Unk32 value="128" />
        <Usage>DIFFUSE</Usage>
        <UsageFlags>NOT_HALF, X4, UNK19</UsageFlags>
        <ExtraFlags value="0" />
        <Width value="512" />
        <Height value="512" />
        <MipLevels value="8" />
        <Format>D3DFMT_DXT5</Format>
        <FileName>prop_test_diff.dds</FileName>
      </Item>
    </TextureDictionary>
    <Shaders>
      <Item>
        <Name>default</Name>
        <FileName>default.sps</FileName>
        <RenderBucket value="0" />
        <Parameters>
          <Item name="DiffuseSampler" type="Texture">
            <Name>prop_test_diff</Name>
          </Item>
          <Item name="matDiffuseColor" type="Vector" x="1" y="1" z="1" w="1" />
        </Parameters>
      </Item>
    </Shaders>
  </ShaderGroup>
  <Skeleton>
    <Unknown1C value="16777216" />
    <Unknown50 value="567032369" />
    <Unknown54 value="562949953" />
    <Unknown58 value="2" />
    <Bones>
      <Item>
        <Name>root</Name>
        <Tag value="0" />
        <Index value="0" />
        <ParentIndex value="-1" />
        <SiblingIndex value="-1" />
        <Flags>Unk0</Flags>
        <Translation x="0" y="0" z="0" />
        <Rotation x="0" y="0" z="0" w="1" />
        <Scale x="1" y="1" z="1" />
        <TransformUnk x="0" y="0" z="0" w="1" />
      </Item>
      <Item>
        <Name>spine</Name>
        <Tag value="23553" />
        <Index value="1" />
        <ParentIndex value="0" />
        <SiblingIndex value="-1" />
        <Flags>LimitRotation</Flags>
        <Translation x="0" y="1" z="0" />
        <Rotation x="0" y="0" z="0" w="1" />
        <Scale x="1" y="1" z="1" />
        <TransformUnk x="0" y="0" z="0" w="1" />
      </Item>
    </Bones>
  </Skeleton>
  <Joints>
    <RotationLimits>
      <Item>
        <BoneId value="23553" />
        <UnknownA value="0" />
        <Min x="-0.5" y="-0.5" z="-0.5" />
        <Max x="0.5" y="0.5" z="0.5" />
      </Item>
    </RotationLimits>
  </Joints>
  <DrawableModelsHigh>
    <Item>
      <RenderMask value="255" />
      <Flags value="0" />
      <HasSkin value="0" />
      <BoneIndex value="0" />
      <Unknown1 value="0" />
      <Geometries>
        <Item>
          <ShaderIndex value="0" />
          <BoundingBoxMin x="0" y="0" z="0" />
          <BoundingBoxMax x="1" y="1" z="0" />
          <VertexBuffer>
            <Flags value="0" />
            <Layout type="GTAV1">
              <Position />
              <Normal />
              <TexCoord0 />
            </Layout>
            <Data>
              0 0 0   0 0 1   0 0
              1 0 0   0 0 1   1 0
              0 1 0   0 0 1   0 1
            </Data>
          </VertexBuffer>
          <IndexBuffer>
            <Data>0 1 2</Data>
          </IndexBuffer>
        </Item>
      </Geometries>
    </Item>
  </DrawableModelsHigh>
</Drawable>"#;

#[test]
fn test_decode_single_triangle_drawable() {
    let drawable = parse_drawable(YDR_XML).unwrap();

    assert_eq!(drawable.name, "prop_test");
    assert_eq!(drawable.lod_dist_high, 450.0);
    assert!(!drawable.is_empty());

    let geometry = &drawable.models_high[0].geometries[0];
    assert_eq!(geometry.vertex_buffer.len(), 3);
    assert_eq!(geometry.index_buffer.triangles, vec![[0, 1, 2]]);

    let vertex = &geometry.vertex_buffer.vertices[0];
    assert_eq!(vertex.position, Some(Vec3::ZERO));
    assert_eq!(vertex.normal, Some(Vec3::Z));
    assert!(vertex.colour0.is_none());

    // vertex order is the index space: third line is the third vertex
    assert_eq!(
        geometry.vertex_buffer.vertices[2].position,
        Some(Vec3::new(0.0, 1.0, 0.0))
    );
}

#[test]
fn test_decode_shader_group() {
    let drawable = parse_drawable(YDR_XML).unwrap();
    let shader_group = drawable.shader_group.unwrap();

    assert_eq!(shader_group.shaders.len(), 1);
    let shader = &shader_group.shaders[0];
    assert_eq!(shader.filename.as_deref(), Some("default.sps"));
    assert!(matches!(
        shader.parameter("DiffuseSampler"),
        Some(ShaderParameter::Texture { texture_name: Some(name), .. }) if name == "prop_test_diff"
    ));

    let texture = &shader_group.texture_dictionary.unwrap().textures[0];
    assert!(texture.usage_flags.not_half);
    assert!(texture.usage_flags.x4);
    assert!(texture.usage_flags.unk19);
    assert!(!texture.usage_flags.hd_split);
    assert_eq!(texture.width, 512);
}

#[test]
fn test_decode_skeleton_and_joints() {
    let drawable = parse_drawable(YDR_XML).unwrap();
    let skeleton = drawable.skeleton.as_ref().unwrap();

    assert_eq!(skeleton.bones.len(), 2);
    assert_eq!(skeleton.bones[1].parent_index, 0);
    assert!(skeleton.bones[0].flags.contains(BoneFlag::Unk0));

    // the joint resolves to the spine bone by tag, not position
    assert_eq!(drawable.joints[0].tag, 23553);
    assert_eq!(
        skeleton.bone_by_tag(drawable.joints[0].tag).unwrap().name,
        "spine"
    );

    let world = skeleton.bind_pose();
    assert_eq!(world[1].w_axis.truncate(), Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_drawable_round_trip() {
    let drawable = parse_drawable(YDR_XML).unwrap();
    let xml = serialize_drawable(&drawable).unwrap();
    let redecoded = parse_drawable(&xml).unwrap();
    assert_eq!(redecoded, drawable);
}

#[test]
fn test_drawable_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prop_test.ydr.xml");

    let drawable = parse_drawable(YDR_XML).unwrap();
    write_drawable(&drawable, &path).unwrap();
    let read_back = read_drawable(&path).unwrap();
    assert_eq!(read_back, drawable);
}

#[test]
fn test_unresolved_joint_tag_aborts_decode() {
    let broken = YDR_XML.replace("<BoneId value=\"23553\" />", "<BoneId value=\"999\" />");
    let err = parse_drawable(&broken).unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedReference { kind: "joint bone tag", .. }
    ));
}

#[test]
fn test_unresolved_shader_index_aborts_decode() {
    let broken = YDR_XML.replace("<ShaderIndex value=\"0\" />", "<ShaderIndex value=\"3\" />");
    let err = parse_drawable(&broken).unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedReference { kind: "shader index", .. }
    ));
}

#[test]
fn test_misaligned_index_buffer_aborts_decode() {
    let broken = YDR_XML.replace("<Data>0 1 2</Data>", "<Data>0 1 2 1</Data>");
    let err = parse_drawable(&broken).unwrap_err();
    assert!(matches!(err, Error::TriangleAlignment { count: 4 }));
}

#[test]
fn test_drawable_dictionary_override() {
    let ydd = r#"<?xml version="1.0" encoding="UTF-8"?>
<DrawableDictionary>
  <Item>
    <Name>head_000</Name>
    <LodDistHigh value="100" />
    <LodDistMed value="100" />
    <LodDistLow value="100" />
    <LodDistVlow value="100" />
    <Skeleton>
      <Unknown1C value="0" />
      <Unknown50 value="0" />
      <Unknown54 value="0" />
      <Unknown58 value="0" />
      <Bones>
        <Item>
          <Name>root</Name>
          <Tag value="0" />
          <Index value="0" />
          <ParentIndex value="-1" />
          <SiblingIndex value="-1" />
          <Flags />
          <Translation x="0" y="0" z="0" />
          <Rotation x="0" y="0" z="0" w="1" />
          <Scale x="1" y="1" z="1" />
        </Item>
      </Bones>
    </Skeleton>
    <DrawableModelsHigh>
      <Item>
        <RenderMask value="255" />
        <Geometries />
      </Item>
    </DrawableModelsHigh>
  </Item>
  <Item>
    <Name>hand_000</Name>
    <LodDistHigh value="100" />
    <LodDistMed value="100" />
    <LodDistLow value="100" />
    <LodDistVlow value="100" />
    <DrawableModelsHigh>
      <Item>
        <RenderMask value="255" />
        <Geometries />
      </Item>
    </DrawableModelsHigh>
  </Item>
</DrawableDictionary>"#;

    let dictionary = parse_drawable_dictionary(ydd).unwrap();
    assert_eq!(dictionary.drawables.len(), 2);

    // the first skeleton-bearing member is authoritative for bone data
    let with_bones = dictionary.drawable_with_bones().unwrap();
    assert_eq!(with_bones.name, "head_000");
    assert_eq!(dictionary.bones_override().unwrap().bones.len(), 1);

    let xml = serialize_drawable_dictionary(&dictionary).unwrap();
    let redecoded = parse_drawable_dictionary(&xml).unwrap();
    assert_eq!(redecoded, dictionary);
}

#[test]
fn test_fragment_positional_bound_pairing() {
    let yft = r#"<?xml version="1.0" encoding="UTF-8"?>
<Fragment>
  <Name>frag_crate</Name>
  <Drawable>
    <Name>frag_crate_shell</Name>
  </Drawable>
  <Physics>
    <LOD1>
      <Archetype>
        <Name>frag_crate</Name>
        <Bounds type="Composite">
          <Item type="Box">
            <BoxMin x="0" y="0" z="0" />
          </Item>
          <Item type="Sphere">
            <Radius value="0.5" />
          </Item>
        </Bounds>
      </Archetype>
      <Groups>
        <Item>
          <Name>base</Name>
          <Index value="0" />
          <ParentIndex value="255" />
          <UnkByte4C value="0" />
          <UnkByte4F value="1" />
          <UnkByte50 value="1" />
          <Mass value="50" />
        </Item>
        <Item>
          <Name>lid</Name>
          <Index value="1" />
          <ParentIndex value="0" />
          <UnkByte4C value="1" />
          <UnkByte4F value="1" />
          <UnkByte50 value="0" />
          <Mass value="5" />
        </Item>
      </Groups>
      <Children>
        <Item>
          <GroupIndex value="1" />
          <BoneTag value="0" />
          <Drawable>
            <Name>lid_mesh</Name>
          </Drawable>
        </Item>
        <Item>
          <GroupIndex value="0" />
          <BoneTag value="0" />
          <Drawable>
            <Name>base_mesh</Name>
          </Drawable>
        </Item>
      </Children>
    </LOD1>
  </Physics>
</Fragment>"#;

    let fragment = parse_fragment(yft).unwrap();
    let physics = fragment.physics.as_ref().unwrap();

    assert_eq!(physics.groups.len(), 2);
    assert_eq!(physics.children.len(), 2);

    // child 0 pairs with bound 0 even though it references group 1
    assert_eq!(physics.children[0].group_index, 1);
    assert_eq!(physics.children[0].bound.attr("type"), Some("Box"));
    assert_eq!(physics.children[1].group_index, 0);
    assert_eq!(physics.children[1].bound.attr("type"), Some("Sphere"));
    assert_eq!(physics.children[0].drawable.name, "lid_mesh");

    let xml = serialize_fragment(&fragment).unwrap();
    let redecoded = parse_fragment(&xml).unwrap();
    assert_eq!(redecoded, fragment);
}
